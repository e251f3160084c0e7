pub mod ipfs;

#[cfg(test)]
pub use ipfs::validate_file;
pub use ipfs::{ImageFile, ImageUploader, PinataUploader, UploadResult};
