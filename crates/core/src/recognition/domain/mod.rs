pub mod encoded_image;
pub mod face_result;
pub mod face_service;
