//! Comic library: volumes, page listings and pagination.
//!
//! Pages are always ordered with [`compare_names`] (so `page2` precedes
//! `page10`), never in Drive's own order. Display and proxy URLs are derived
//! from the file id on every response.

mod model;
mod pagination;
mod service;
mod sort;
mod urls;

pub use model::{PageEntry, PageFile, Volume, VolumeTitle};
pub use pagination::{paginate, PageRequest, PaginationMeta, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
pub use service::{
    folder_from_path, LibraryService, PageListing, Revalidation, VolumeList,
    DEFAULT_LISTING_CAPACITY, DEFAULT_LISTING_TTL, DEFAULT_ROOT_FOLDER,
};
pub use sort::{compare_names, sort_by_name};
pub use urls::{proxy_url, DisplayUrls, ImageFormat, PROXY_PATH};
