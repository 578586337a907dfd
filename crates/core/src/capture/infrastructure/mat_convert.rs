use opencv::core::Mat;
use opencv::prelude::*;

use crate::shared::frame::Frame;

/// Converts a BGR `Mat` into an owned `Frame`, stamping `index`.
pub fn mat_to_frame(mat: &Mat, index: u64) -> Result<Frame, Box<dyn std::error::Error>> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let channels = mat.channels() as u8;

    let data = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        let owned = mat.try_clone()?;
        owned.data_bytes()?.to_vec()
    };

    Ok(Frame::new(data, width, height, channels, index))
}

/// Converts a `Frame` into an owned, continuous `Mat` of the same layout.
pub fn frame_to_mat(frame: &Frame) -> Result<Mat, Box<dyn std::error::Error>> {
    let flat = Mat::from_slice(frame.data())?;
    let shaped = flat.reshape(frame.channels() as i32, frame.height() as i32)?;
    Ok(shaped.try_clone()?)
}

/// Copies `mat` pixel data back into `frame`.
///
/// The two must describe the same raster; a size mismatch is an error, not
/// a silent truncation.
pub fn copy_mat_into_frame(mat: &Mat, frame: &mut Frame) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = mat.data_bytes()?;
    if bytes.len() != frame.data().len() {
        return Err(format!(
            "mat size {} does not match frame size {}",
            bytes.len(),
            frame.data().len()
        )
        .into());
    }
    frame.data_mut().copy_from_slice(bytes);
    Ok(())
}
