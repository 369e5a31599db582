#[cfg(test)]
pub mod helpers {
    use crate::config::{CacheConfig, SwipeConfig, SwipeboxConfig, TransitionConfig};
    use crate::gallery::{Caption, Gallery, ImageDescriptor};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    pub fn create_test_config() -> SwipeboxConfig {
        SwipeboxConfig {
            enable_keyboard_input: true,
            preload_next_image: true,
            backdrop_closes_modal: false,
            show_close_button: true,
            show_image_count: true,
            image_count_separator: " of ".to_string(),
            width: 1024,
            cell_width_px: 8,
            locale: Some("en".to_string()),
            swipe: SwipeConfig {
                revert_enabled: false,
                commit_threshold: 0.5,
            },
            transition: TransitionConfig {
                enabled: true,
                effect: "slide".to_string(),
                duration_ms: 120,
                stiffness: 170.0,
                damping: 26.0,
            },
            cache: CacheConfig {
                max_entries: 8,
                max_dimension: 64,
            },
        }
    }

    /// `count` images at `/images/image_<i>.jpg`, captioned `Image <i>`.
    pub fn create_test_gallery(count: usize) -> Gallery {
        Gallery::new(
            (0..count)
                .map(|i| {
                    ImageDescriptor::new(format!("/images/image_{}.jpg", i))
                        .with_caption(Caption::Plain(format!("Image {}", i)))
                })
                .collect(),
        )
    }

    pub struct TestFileSystem {
        pub temp_dir: TempDir,
    }

    impl TestFileSystem {
        pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
            let temp_dir = TempDir::new()?;
            Ok(Self { temp_dir })
        }

        pub fn create_file(
            &self,
            name: &str,
            content: &str,
        ) -> Result<String, Box<dyn std::error::Error>> {
            let file_path = self.temp_dir.path().join(name);
            fs::write(&file_path, content)?;
            Ok(file_path.to_string_lossy().to_string())
        }

        pub fn create_directory(&self, name: &str) -> Result<String, Box<dyn std::error::Error>> {
            let dir_path = self.temp_dir.path().join(name);
            fs::create_dir_all(&dir_path)?;
            Ok(dir_path.to_string_lossy().to_string())
        }

        /// A tiny 1x1 baseline JPEG.
        pub fn create_test_image(&self, name: &str) -> Result<String, Box<dyn std::error::Error>> {
            let content = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01\x01\x01\x00H\x00H\x00\x00\xFF\xDB\x00C\x00\x08\x06\x06\x07\x06\x05\x08\x07\x07\x07\t\t\x08\n\x0C\x14\r\x0C\x0B\x0B\x0C\x19\x12\x13\x0F\x14\x1D\x1A\x1F\x1E\x1D\x1A\x1C\x1C $.\' \",#\x1C\x1C(7),01444\x1F\'9=82<.342\xFF\xC0\x00\x11\x08\x00\x01\x00\x01\x01\x01\x11\x00\x02\x11\x01\x03\x11\x01\xFF\xC4\x00\x14\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x08\xFF\xC4\x00\x14\x10\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xFF\xDA\x00\x0C\x03\x01\x00\x02\x11\x03\x11\x00\x3F\x00\xAA\xFF\xD9";
            self.create_binary_file(name, content)
        }

        /// A real PNG of the given size, decodable by the image loader.
        pub fn create_png(
            &self,
            name: &str,
            width: u32,
            height: u32,
        ) -> Result<String, Box<dyn std::error::Error>> {
            let file_path = self.temp_dir.path().join(name);
            image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40])).save(&file_path)?;
            Ok(file_path.to_string_lossy().to_string())
        }

        pub fn create_binary_file(
            &self,
            name: &str,
            content: &[u8],
        ) -> Result<String, Box<dyn std::error::Error>> {
            let file_path = self.temp_dir.path().join(name);
            fs::write(&file_path, content)?;
            Ok(file_path.to_string_lossy().to_string())
        }

        pub fn get_path(&self) -> &Path {
            self.temp_dir.path()
        }
    }

    pub fn assert_file_exists(path: &str) {
        assert!(Path::new(path).exists(), "File should exist: {}", path);
    }
}
