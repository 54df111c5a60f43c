pub mod frame_processor;
pub mod moose_service;
pub mod moosify_use_case;
pub mod multi_frame_processor;
