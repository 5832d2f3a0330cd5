pub mod sidecar_detection_source;
