pub mod pipeline_logger;
pub mod redact_video_use_case;
