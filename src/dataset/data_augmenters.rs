pub mod scale_crop_flip;
