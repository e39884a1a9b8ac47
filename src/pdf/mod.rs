//! PDF rasterization module
//!
//! Turns an uploaded PDF into one raster image per page so each page can be
//! sent through OCR.

mod rasterizer;

pub use rasterizer::{
    ordered_page_images, page_number_of, PageRasterizer, PdftoppmRasterizer, RasterizeError,
};

#[cfg(test)]
pub use rasterizer::MockRasterizer;
