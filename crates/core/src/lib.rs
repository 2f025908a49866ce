pub mod shared {
    pub mod capture_settings;
    pub mod composite_layout;
    pub mod constants;
    pub mod depth_map;
    pub mod pixel_buffer;
    pub mod timestamp;
}

pub mod depth {
    pub mod domain {
        pub mod depth_normalizer;
        pub mod depth_range;
    }
    pub mod infrastructure {
        pub mod grayscale_normalizer;
    }
}

pub mod compositing {
    pub mod domain {
        pub mod frame_compositor;
    }
    pub mod infrastructure {
        pub mod side_by_side_compositor;
    }
}

pub mod capture {
    pub mod domain {
        pub mod capture_device;
        pub mod sample;
        pub mod sample_sink;
    }
    pub mod infrastructure {
        pub mod synthetic_camera;
    }
    pub mod stream_synchronizer;
}

pub mod encoding {
    pub mod domain {
        pub mod image_writer;
        pub mod video_encoder;
    }
    pub mod infrastructure {
        pub mod ffmpeg_encoder;
        pub mod image_file_writer;
    }
}

pub mod pipeline {
    pub mod capture_session;
    pub mod frame_processor;
    pub mod pipeline_logger;
}

pub mod bridge {
    pub mod control;
    pub mod method_channel;
}

#[cfg(test)]
mod testing;
