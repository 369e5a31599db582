use crate::error::{Result, SwipeboxError};
use content_inspector::{ContentType, inspect};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

// Enough bytes for every raster magic number plus SVG preambles (XML
// declaration, comments, DOCTYPE) before the <svg tag
const CONTENT_DETECTION_BUFFER_SIZE: usize = 512;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CaptionSpan {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// Image caption: plain text or a sequence of styled spans.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Caption {
    Plain(String),
    Rich(Vec<CaptionSpan>),
}

impl Caption {
    pub fn plain_text(&self) -> String {
        match self {
            Caption::Plain(text) => text.clone(),
            Caption::Rich(spans) => spans.iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// One entry of the caller-supplied image list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ImageDescriptor {
    #[serde(rename = "src")]
    pub source_url: String,
    #[serde(rename = "srcset", default, skip_serializing_if = "Option::is_none")]
    pub source_set: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Caption>,
    #[serde(rename = "thumbnail", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl ImageDescriptor {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn with_caption(mut self, caption: Caption) -> Self {
        self.caption = Some(caption);
        self
    }

    /// `srcset`-style attribute value, when a source set was supplied.
    pub fn source_set_attr(&self) -> Option<String> {
        self.source_set.as_ref().map(|set| set.join(","))
    }

    pub fn has_source(&self) -> bool {
        !self.source_url.trim().is_empty()
    }

    /// Last path segment of the source, for status lines.
    pub fn display_name(&self) -> &str {
        self.source_url
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_url)
    }
}

/// Returns true when the file at `path` looks like an image, judged by its
/// leading bytes rather than its extension.
pub fn is_image_file(path: &Path) -> bool {
    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };
    let mut buffer = [0u8; CONTENT_DETECTION_BUFFER_SIZE];
    let Ok(bytes_read) = file.read(&mut buffer) else {
        return false;
    };
    let sample = &buffer[..bytes_read];

    match inspect(sample) {
        ContentType::BINARY => has_image_magic(sample),
        ContentType::UTF_8 | ContentType::UTF_8_BOM => {
            let content = String::from_utf8_lossy(sample).to_lowercase();
            content.contains("<svg") || (content.contains("<?xml") && content.contains("svg"))
        }
        _ => false,
    }
}

fn has_image_magic(sample: &[u8]) -> bool {
    if sample.len() < 4 {
        return false;
    }
    sample.starts_with(&[0xFF, 0xD8, 0xFF]) // JPEG
        || sample.starts_with(&[0x89, 0x50, 0x4E, 0x47]) // PNG
        || sample.starts_with(b"GIF8")
        || (sample.starts_with(b"RIFF") && sample.len() >= 12 && &sample[8..12] == b"WEBP")
        || sample.starts_with(&[0x42, 0x4D]) // BMP
        || sample.starts_with(&[0x49, 0x49, 0x2A, 0x00]) // TIFF (LE)
        || sample.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) // TIFF (BE)
}

/// Ordered, immutable list of images shown by the lightbox.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    images: Vec<ImageDescriptor>,
}

impl Gallery {
    pub fn new(images: Vec<ImageDescriptor>) -> Self {
        Self { images }
    }

    /// Every image file directly inside `dir`, sorted by file name, captioned
    /// with the file stem.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            if entry.file_type()?.is_file() && is_image_file(&entry.path()) {
                paths.push(entry.path());
            }
        }
        paths.sort_by_key(|p| p.file_name().map(|n| n.to_string_lossy().to_lowercase()));
        debug!(dir = %dir.as_ref().display(), count = paths.len(), "scanned gallery directory");

        Ok(Self::new(paths.iter().map(|p| Self::descriptor_for(p)).collect()))
    }

    /// JSON array of descriptors (`src`, `srcset`, `caption`, `thumbnail`).
    /// Relative sources resolve against the manifest's directory.
    pub fn from_manifest<P: AsRef<Path>>(manifest: P) -> Result<Self> {
        let manifest = manifest.as_ref();
        let contents = fs::read_to_string(manifest)?;
        let mut images: Vec<ImageDescriptor> = serde_json::from_str(&contents)?;

        if let Some(base) = manifest.parent() {
            for image in &mut images {
                if image.has_source() && !image.source_url.contains("://") {
                    let source = Path::new(&image.source_url);
                    if source.is_relative() {
                        image.source_url = base.join(source).to_string_lossy().into_owned();
                    }
                }
            }
        }
        Ok(Self::new(images))
    }

    /// Builds a gallery from command-line paths: a single directory, a single
    /// `.json` manifest, or a list of image files.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let gallery = match paths {
            [single] if single.as_ref().is_dir() => Self::from_dir(single)?,
            [single]
                if single
                    .as_ref()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json")) =>
            {
                Self::from_manifest(single)?
            }
            _ => Self::new(
                paths
                    .iter()
                    .map(|p| p.as_ref())
                    .filter(|p| is_image_file(p))
                    .map(Self::descriptor_for)
                    .collect(),
            ),
        };

        if gallery.is_empty() {
            return Err(SwipeboxError::EmptyGallery);
        }
        Ok(gallery)
    }

    fn descriptor_for(path: &Path) -> ImageDescriptor {
        let caption = path
            .file_stem()
            .map(|stem| Caption::Plain(stem.to_string_lossy().into_owned()));
        ImageDescriptor {
            source_url: path.to_string_lossy().into_owned(),
            caption,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Out-of-range indices are `None`, never a panic.
    pub fn get(&self, index: usize) -> Option<&ImageDescriptor> {
        self.images.get(index)
    }

    pub fn images(&self) -> &[ImageDescriptor] {
        &self.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::helpers::*;

    #[test]
    fn test_source_set_attr_joins_with_commas() {
        let image = ImageDescriptor {
            source_url: "a.jpg".to_string(),
            source_set: Some(vec!["a-1x.jpg 1x".to_string(), "a-2x.jpg 2x".to_string()]),
            ..Default::default()
        };
        assert_eq!(image.source_set_attr().as_deref(), Some("a-1x.jpg 1x,a-2x.jpg 2x"));
        assert_eq!(ImageDescriptor::new("b.jpg").source_set_attr(), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(ImageDescriptor::new("/photos/2024/beach.jpg").display_name(), "beach.jpg");
        assert_eq!(ImageDescriptor::new("https://x.test/a/b.png").display_name(), "b.png");
        assert_eq!(ImageDescriptor::new("plain.gif").display_name(), "plain.gif");
    }

    #[test]
    fn test_caption_deserializes_plain_and_rich() {
        let plain: Caption = serde_json::from_str(r#""Sunset""#).unwrap();
        assert_eq!(plain, Caption::Plain("Sunset".to_string()));

        let rich: Caption =
            serde_json::from_str(r#"[{"text":"Big ","bold":true},{"text":"sky"}]"#).unwrap();
        assert_eq!(rich.plain_text(), "Big sky");
        match rich {
            Caption::Rich(spans) => {
                assert!(spans[0].bold);
                assert!(!spans[1].bold);
            }
            Caption::Plain(_) => panic!("expected rich caption"),
        }
    }

    #[test]
    fn test_is_image_file_by_content() {
        let fs = TestFileSystem::new().unwrap();
        let jpeg = fs.create_test_image("photo.txt").unwrap();
        let text = fs.create_file("notes.jpg", "just some words").unwrap();
        let svg = fs
            .create_file("logo.data", "<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\"></svg>")
            .unwrap();

        assert!(is_image_file(Path::new(&jpeg)));
        assert!(!is_image_file(Path::new(&text)));
        assert!(is_image_file(Path::new(&svg)));
        assert!(!is_image_file(Path::new("/definitely/not/here.png")));
    }

    #[test]
    fn test_from_dir_sorts_and_skips_non_images() {
        let fs = TestFileSystem::new().unwrap();
        fs.create_test_image("c.jpg").unwrap();
        fs.create_test_image("A.jpg").unwrap();
        fs.create_test_image("b.jpg").unwrap();
        fs.create_file("readme.md", "# hello").unwrap();
        fs.create_directory("nested.jpg").unwrap();

        let gallery = Gallery::from_dir(fs.get_path()).unwrap();

        let names: Vec<&str> = gallery.images().iter().map(|i| i.display_name()).collect();
        assert_eq!(names, vec!["A.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(
            gallery.get(1).and_then(|i| i.caption.clone()),
            Some(Caption::Plain("b".to_string()))
        );
        assert!(gallery.get(3).is_none());
    }

    #[test]
    fn test_from_manifest_resolves_relative_sources() {
        let fs = TestFileSystem::new().unwrap();
        let manifest = fs
            .create_file(
                "gallery.json",
                r#"[
                    {"src": "one.jpg", "caption": "First"},
                    {"src": "https://cdn.test/two.jpg", "srcset": ["two-1x.jpg", "two-2x.jpg"]},
                    {"src": "/abs/three.jpg", "thumbnail": "/abs/three-t.jpg"}
                ]"#,
            )
            .unwrap();

        let gallery = Gallery::from_manifest(&manifest).unwrap();

        assert_eq!(gallery.len(), 3);
        assert_eq!(
            gallery.get(0).unwrap().source_url,
            fs.get_path().join("one.jpg").to_string_lossy()
        );
        assert_eq!(gallery.get(1).unwrap().source_url, "https://cdn.test/two.jpg");
        assert_eq!(gallery.get(2).unwrap().thumbnail_url.as_deref(), Some("/abs/three-t.jpg"));
    }

    #[test]
    fn test_from_paths_empty_is_error() {
        let fs = TestFileSystem::new().unwrap();
        fs.create_file("notes.txt", "nothing to see").unwrap();

        let result = Gallery::from_paths(&[fs.get_path()]);
        assert!(matches!(result, Err(SwipeboxError::EmptyGallery)));
    }

    #[test]
    fn test_from_paths_file_list() {
        let fs = TestFileSystem::new().unwrap();
        let a = fs.create_test_image("a.jpg").unwrap();
        let b = fs.create_file("b.txt", "text").unwrap();
        let c = fs.create_test_image("c.jpg").unwrap();

        let gallery = Gallery::from_paths(&[a, b, c]).unwrap();
        assert_eq!(gallery.len(), 2);
    }
}
