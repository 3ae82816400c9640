pub mod clone_folder;
pub mod download;
pub mod overwrite;
