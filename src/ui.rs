use crate::config::SwipeboxConfig;
use crate::gallery::{Caption, Gallery};
use crate::input::ClickTarget;
use crate::localization::Localization;
use crate::navigation::{Boundaries, RenderFrame};
use crate::preload::{CacheEntry, PreloadCache};
use image::RgbImage;
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

const ARROW_WIDTH: u16 = 3;
const CLOSE_BUTTON_WIDTH: u16 = 3;
const HALF_BLOCK: &str = "▀";

pub struct UILayout {
    pub max_content_cells: u16,
    pub show_close_button: bool,
    pub header: Rect,
    pub close_button: Option<Rect>,
    pub prev_arrow: Option<Rect>,
    pub next_arrow: Option<Rect>,
    pub image_area: Rect,
    pub footer: Rect,
    pub help: Rect,
}

impl UILayout {
    pub fn new(max_content_cells: u16, show_close_button: bool) -> Self {
        Self {
            max_content_cells: max_content_cells.max(1),
            show_close_button,
            header: Rect::default(),
            close_button: None,
            prev_arrow: None,
            next_arrow: None,
            image_area: Rect::default(),
            footer: Rect::default(),
            help: Rect::default(),
        }
    }

    pub fn from_config(config: &SwipeboxConfig) -> Self {
        let cell_width = u32::from(config.cell_width_px.max(1));
        let max_cells = (config.width / cell_width).min(u32::from(u16::MAX)) as u16;
        Self::new(max_cells, config.show_close_button)
    }

    /// Splits `area` into header, arrow columns around a centred image area,
    /// footer and help line. Arrows are omitted at the matching boundary.
    pub fn calculate_layout(&mut self, area: Rect, bounds: Boundaries) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title and close button
                Constraint::Min(1),    // Image strip
                Constraint::Length(1), // Caption and count
                Constraint::Length(1), // Key hints
            ])
            .split(area);

        self.header = rows[0];
        self.footer = rows[2];
        self.help = rows[3];

        let main = rows[1];
        let content_width = main
            .width
            .saturating_sub(ARROW_WIDTH * 2)
            .min(self.max_content_cells);
        let side = main.width.saturating_sub(content_width + ARROW_WIDTH * 2) / 2;

        let prev = Rect::new(main.x + side, main.y, ARROW_WIDTH, main.height).intersection(main);
        self.image_area = Rect::new(prev.right(), main.y, content_width, main.height).intersection(main);
        let next = Rect::new(self.image_area.right(), main.y, ARROW_WIDTH, main.height).intersection(main);

        self.prev_arrow = (!bounds.at_first).then_some(prev);
        self.next_arrow = (!bounds.at_last).then_some(next);

        self.close_button = self.show_close_button.then(|| {
            let width = CLOSE_BUTTON_WIDTH.min(self.header.width);
            Rect::new(
                self.header.right().saturating_sub(width),
                self.header.y,
                width,
                self.header.height,
            )
        });
    }

    /// Image width in pixels, the distance a full swipe covers.
    pub fn display_width_px(&self, cell_width_px: u16) -> f32 {
        f32::from(self.image_area.width) * f32::from(cell_width_px.max(1))
    }

    pub fn hit_test(&self, column: u16, row: u16) -> ClickTarget {
        let position = Position::new(column, row);
        let hit = |rect: Option<Rect>| rect.is_some_and(|r| r.contains(position));

        if hit(self.close_button) {
            ClickTarget::CloseButton
        } else if hit(self.prev_arrow) {
            ClickTarget::PrevArrow
        } else if hit(self.next_arrow) {
            ClickTarget::NextArrow
        } else if self.image_area.contains(position) {
            ClickTarget::Image
        } else {
            ClickTarget::Backdrop
        }
    }
}

/// Draws an RGB image with upper-half blocks, two pixel rows per cell,
/// shifted horizontally by `shift` cells and clipped to the render area.
pub struct HalfBlockImage<'a> {
    image: &'a RgbImage,
    shift: i32,
}

impl<'a> HalfBlockImage<'a> {
    pub fn new(image: &'a RgbImage) -> Self {
        Self { image, shift: 0 }
    }

    pub fn shift(mut self, cells: i32) -> Self {
        self.shift = cells;
        self
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        let [r, g, b] = self.image.get_pixel(x, y).0;
        Color::Rgb(r, g, b)
    }
}

/// Largest size with the image's aspect ratio fitting `max_w` x `max_h`.
fn fit_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = (f64::from(max_w) / f64::from(width)).min(f64::from(max_h) / f64::from(height));
    let fitted_w = ((f64::from(width) * scale).round() as u32).clamp(1, max_w);
    let fitted_h = ((f64::from(height) * scale).round() as u32).clamp(1, max_h);
    (fitted_w, fitted_h)
}

impl Widget for HalfBlockImage<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 || area.is_empty() {
            return;
        }

        let (cols, px_rows) = fit_dimensions(
            width,
            height,
            u32::from(area.width),
            u32::from(area.height) * 2,
        );
        let cell_rows = px_rows.div_ceil(2);
        let pad_x = (u32::from(area.width) - cols) / 2;
        let pad_y = (u32::from(area.height) - cell_rows) / 2;

        for col in 0..cols {
            let x = i32::from(area.x) + (pad_x + col) as i32 + self.shift;
            if x < i32::from(area.x) || x >= i32::from(area.right()) {
                continue;
            }
            let src_x = col * width / cols;

            for row in 0..cell_rows {
                let y = area.y + (pad_y + row) as u16;
                let top = self.color_at(src_x, row * 2 * height / px_rows);
                let bottom_row = row * 2 + 1;
                let bottom = if bottom_row < px_rows {
                    self.color_at(src_x, bottom_row * height / px_rows)
                } else {
                    Color::Reset
                };

                if let Some(cell) = buf.cell_mut((x as u16, y)) {
                    cell.set_symbol(HALF_BLOCK).set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

/// `area` moved by `shift` columns and clipped back into `area`.
fn shifted_rect(area: Rect, shift: i32) -> Option<Rect> {
    let left = (i32::from(area.x) + shift).max(i32::from(area.x));
    let right = (i32::from(area.right()) + shift).min(i32::from(area.right()));
    (right > left).then(|| Rect::new(left as u16, area.y, (right - left) as u16, area.height))
}

fn caption_line(caption: &Caption) -> Line<'static> {
    match caption {
        Caption::Plain(text) => Line::from(text.clone()),
        Caption::Rich(spans) => Line::from(
            spans
                .iter()
                .map(|span| {
                    let mut style = Style::default();
                    if span.bold {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    if span.italic {
                        style = style.add_modifier(Modifier::ITALIC);
                    }
                    Span::styled(span.text.clone(), style)
                })
                .collect::<Vec<_>>(),
        ),
    }
}

pub struct RenderContext<'a> {
    pub gallery: &'a Gallery,
    pub cache: &'a PreloadCache,
    pub localization: &'a Localization,
    pub config: &'a SwipeboxConfig,
}

pub struct UIRenderer;

impl UIRenderer {
    pub fn render(f: &mut Frame, layout: &UILayout, frame: &RenderFrame, ctx: &RenderContext) {
        Self::render_header(f, layout, frame, ctx);
        Self::render_slides(f, layout, frame, ctx);
        Self::render_arrows(f, layout);
        Self::render_footer(f, layout, frame, ctx);
        Self::render_help(f, layout, frame, ctx);
    }

    fn render_header(f: &mut Frame, layout: &UILayout, frame: &RenderFrame, ctx: &RenderContext) {
        let mut title = ctx.localization.get("gallery_title");
        if let Some(image) = ctx.gallery.get(frame.current_index) {
            title = format!("{} · {}", title, image.display_name());
        }
        let header = Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        f.render_widget(header, layout.header);

        if let Some(rect) = layout.close_button {
            let close = Paragraph::new("✕")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
            f.render_widget(close, rect);
        }
    }

    fn render_slides(f: &mut Frame, layout: &UILayout, frame: &RenderFrame, ctx: &RenderContext) {
        let cell_width = f32::from(ctx.config.cell_width_px.max(1));
        let to_cells = |offset: f32| (offset / cell_width).round() as i32;

        let slides = [
            Some((frame.current_index, frame.current_offset)),
            frame.previous.map(|slot| (slot.index, slot.offset)),
            frame.next.map(|slot| (slot.index, slot.offset)),
        ];
        for (index, offset) in slides.into_iter().flatten() {
            Self::render_slide(f, layout.image_area, index, to_cells(offset), ctx);
        }
    }

    fn render_slide(f: &mut Frame, area: Rect, index: usize, shift: i32, ctx: &RenderContext) {
        let Some(image) = ctx.gallery.get(index) else {
            return;
        };

        let placeholder = if !image.has_source() {
            ctx.localization.get("image_missing")
        } else {
            match ctx.cache.get(&image.source_url) {
                Some(CacheEntry::Ready(decoded)) => {
                    HalfBlockImage::new(&decoded.preview)
                        .shift(shift)
                        .render(area, f.buffer_mut());
                    return;
                }
                Some(CacheEntry::Failed(_)) => ctx.localization.with_name("image_failed", image.display_name()),
                Some(CacheEntry::Pending) | None => {
                    ctx.localization.with_name("image_loading", image.display_name())
                }
            }
        };

        let Some(visible) = shifted_rect(area, shift) else {
            return;
        };
        let middle = Rect::new(visible.x, visible.y + visible.height / 2, visible.width, 1)
            .intersection(visible);
        let paragraph = Paragraph::new(placeholder)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(paragraph, middle);
    }

    fn render_arrows(f: &mut Frame, layout: &UILayout) {
        let arrow_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (rect, glyph) in [(layout.prev_arrow, "‹"), (layout.next_arrow, "›")] {
            let Some(rect) = rect else { continue };
            let middle = Rect::new(rect.x, rect.y + rect.height / 2, rect.width, 1).intersection(rect);
            f.render_widget(
                Paragraph::new(glyph).alignment(Alignment::Center).style(arrow_style),
                middle,
            );
        }
    }

    fn render_footer(f: &mut Frame, layout: &UILayout, frame: &RenderFrame, ctx: &RenderContext) {
        let count = ctx.config.show_image_count.then(|| {
            ctx.localization.image_count(
                frame.current_index,
                ctx.gallery.len(),
                &ctx.config.image_count_separator,
            )
        });
        let count_width = count
            .as_ref()
            .map(|c| Line::from(c.as_str()).width() as u16 + 1)
            .unwrap_or(0);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(count_width)])
            .split(layout.footer);

        if let Some(caption) = ctx
            .gallery
            .get(frame.current_index)
            .and_then(|image| image.caption.as_ref())
        {
            f.render_widget(Paragraph::new(caption_line(caption)), columns[0]);
        }

        if let Some(count) = count {
            let counter = Paragraph::new(count)
                .alignment(Alignment::Right)
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(counter, columns[1]);
        }
    }

    fn render_help(f: &mut Frame, layout: &UILayout, frame: &RenderFrame, ctx: &RenderContext) {
        let mut hints = Vec::new();
        if !frame.at_first {
            hints.push(format!("‹ {}", ctx.localization.get("arrow_prev")));
        }
        if !frame.at_last {
            hints.push(format!("{} ›", ctx.localization.get("arrow_next")));
        }
        hints.push(ctx.localization.get("close_hint"));

        let help = Paragraph::new(hints.join("  ·  "))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(help, layout.help);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::gallery::{CaptionSpan, ImageDescriptor};
    use crate::navigation::NeighborSlot;
    use crate::test_utils::helpers::*;
    use ratatui::{Terminal, backend::TestBackend};

    const MIDDLE: Boundaries = Boundaries {
        at_first: false,
        at_last: false,
    };

    fn frame_at(index: usize, total: usize) -> RenderFrame {
        RenderFrame {
            current_index: index,
            current_offset: 0.0,
            previous: None,
            next: None,
            at_first: index == 0,
            at_last: index + 1 == total,
            transitioning: false,
        }
    }

    fn bounds_of(frame: &RenderFrame) -> Boundaries {
        Boundaries {
            at_first: frame.at_first,
            at_last: frame.at_last,
        }
    }

    fn draw(gallery: &Gallery, frame: &RenderFrame, config: &SwipeboxConfig) -> Vec<String> {
        let localization = Localization::new("en").unwrap();
        let cache = PreloadCache::new(&CacheConfig::default());
        let mut layout = UILayout::from_config(config);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();

        terminal
            .draw(|f| {
                layout.calculate_layout(f.area(), bounds_of(frame));
                let ctx = RenderContext {
                    gallery,
                    cache: &cache,
                    localization: &localization,
                    config,
                };
                UIRenderer::render(f, &layout, frame, &ctx);
            })
            .unwrap();

        buffer_lines(terminal.backend().buffer())
    }

    fn buffer_lines(buffer: &Buffer) -> Vec<String> {
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_layout_centres_capped_image_area() {
        let mut layout = UILayout::new(40, true);
        layout.calculate_layout(Rect::new(0, 0, 80, 20), MIDDLE);

        assert_eq!(layout.image_area.width, 40);
        assert_eq!(layout.image_area.x, 20);
        assert_eq!(layout.image_area.height, 17);
        assert_eq!(layout.prev_arrow.unwrap().right(), layout.image_area.x);
        assert_eq!(layout.next_arrow.unwrap().x, layout.image_area.right());
        assert_eq!(layout.close_button.unwrap().right(), 80);
    }

    #[test]
    fn test_layout_narrow_terminal_uses_available_width() {
        let mut layout = UILayout::new(500, false);
        layout.calculate_layout(Rect::new(0, 0, 30, 10), MIDDLE);

        assert_eq!(layout.image_area.width, 24);
        assert_eq!(layout.close_button, None);
    }

    #[rstest::rstest]
    #[case(true, false)]
    #[case(false, true)]
    #[case(true, true)]
    fn test_layout_hides_arrows_at_boundaries(#[case] at_first: bool, #[case] at_last: bool) {
        let mut layout = UILayout::new(40, true);
        layout.calculate_layout(Rect::new(0, 0, 80, 20), Boundaries { at_first, at_last });

        assert_eq!(layout.prev_arrow.is_none(), at_first);
        assert_eq!(layout.next_arrow.is_none(), at_last);
    }

    #[test]
    fn test_hit_test_regions() {
        let mut layout = UILayout::new(40, true);
        layout.calculate_layout(Rect::new(0, 0, 80, 20), MIDDLE);

        assert_eq!(layout.hit_test(79, 0), ClickTarget::CloseButton);
        assert_eq!(layout.hit_test(18, 8), ClickTarget::PrevArrow);
        assert_eq!(layout.hit_test(61, 8), ClickTarget::NextArrow);
        assert_eq!(layout.hit_test(40, 8), ClickTarget::Image);
        assert_eq!(layout.hit_test(2, 8), ClickTarget::Backdrop);
        assert_eq!(layout.hit_test(10, 0), ClickTarget::Backdrop);
    }

    #[test]
    fn test_hidden_arrow_area_is_backdrop() {
        let mut layout = UILayout::new(40, true);
        layout.calculate_layout(
            Rect::new(0, 0, 80, 20),
            Boundaries {
                at_first: true,
                at_last: false,
            },
        );
        assert_eq!(layout.hit_test(18, 8), ClickTarget::Backdrop);
    }

    #[test]
    fn test_display_width_follows_cell_width() {
        let mut layout = UILayout::new(40, true);
        layout.calculate_layout(Rect::new(0, 0, 80, 20), MIDDLE);
        assert_eq!(layout.display_width_px(8), 320.0);
    }

    #[test]
    fn test_from_config_caps_content_by_pixel_width() {
        let config = SwipeboxConfig {
            width: 400,
            cell_width_px: 10,
            ..SwipeboxConfig::default()
        };
        assert_eq!(UILayout::from_config(&config).max_content_cells, 40);
    }

    #[test]
    fn test_footer_shows_caption_and_count() {
        let gallery = create_test_gallery(3);
        let lines = draw(&gallery, &frame_at(1, 3), &create_test_config());

        let footer = &lines[10];
        assert!(footer.contains("Image 1"), "footer was {:?}", footer);
        assert!(footer.trim_end().ends_with("2 of 3"), "footer was {:?}", footer);
    }

    #[test]
    fn test_count_uses_configured_separator() {
        let gallery = create_test_gallery(3);
        let config = SwipeboxConfig {
            image_count_separator: "/".to_string(),
            ..create_test_config()
        };
        let lines = draw(&gallery, &frame_at(2, 3), &config);
        assert!(lines[10].trim_end().ends_with("3/3"));
    }

    #[test]
    fn test_count_can_be_hidden() {
        let gallery = create_test_gallery(3);
        let config = SwipeboxConfig {
            show_image_count: false,
            ..create_test_config()
        };
        let lines = draw(&gallery, &frame_at(0, 3), &config);
        assert!(!lines[10].contains("1 of 3"));
    }

    #[test]
    fn test_rich_caption_is_flattened_into_footer() {
        let gallery = Gallery::new(vec![ImageDescriptor::new("/images/a.jpg").with_caption(
            Caption::Rich(vec![
                CaptionSpan {
                    text: "Bold".to_string(),
                    bold: true,
                    italic: false,
                },
                CaptionSpan {
                    text: " and plain".to_string(),
                    ..Default::default()
                },
            ]),
        )]);
        let lines = draw(&gallery, &frame_at(0, 1), &create_test_config());
        assert!(lines[10].starts_with("Bold and plain"));
    }

    #[test]
    fn test_first_image_hides_prev_arrow_and_hint() {
        let gallery = create_test_gallery(3);
        let lines = draw(&gallery, &frame_at(0, 3), &create_test_config());
        let screen = lines.join("\n");

        assert!(!screen.contains('‹'));
        assert!(screen.contains('›'));
        assert!(lines[11].contains("Next (Right arrow key)"));
        assert!(!lines[11].contains("Previous"));
    }

    #[test]
    fn test_uncached_image_shows_loading_placeholder() {
        let gallery = create_test_gallery(3);
        let lines = draw(&gallery, &frame_at(1, 3), &create_test_config());
        assert!(lines.iter().any(|l| l.contains("Loading image_1.jpg")));
    }

    #[test]
    fn test_missing_source_shows_notice() {
        let gallery = Gallery::new(vec![ImageDescriptor::new("")]);
        let lines = draw(&gallery, &frame_at(0, 1), &create_test_config());
        assert!(lines.iter().any(|l| l.contains("No source for this image")));
    }

    #[test]
    fn test_neighbour_placeholder_slides_in() {
        let gallery = create_test_gallery(3);
        let config = create_test_config();
        let mut frame = frame_at(1, 3);
        // Current image mostly off to the left, next one nearly in place
        frame.current_offset = -300.0;
        frame.next = Some(NeighborSlot {
            index: 2,
            offset: 20.0,
        });

        let lines = draw(&gallery, &frame, &config);
        assert!(lines.iter().any(|l| l.contains("image_2.jpg")));
    }

    #[test]
    fn test_half_block_image_fills_area() {
        let image = RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);

        HalfBlockImage::new(&image).render(area, &mut buf);

        for y in 0..2 {
            for x in 0..4 {
                let cell = &buf[(x, y)];
                assert_eq!(cell.symbol(), HALF_BLOCK);
                assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
                assert_eq!(cell.bg, Color::Rgb(255, 0, 0));
            }
        }
    }

    #[test]
    fn test_half_block_image_shift_is_clipped() {
        let image = RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 255]));
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);

        HalfBlockImage::new(&image).shift(2).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), " ");
        assert_eq!(buf[(1, 0)].symbol(), " ");
        assert_eq!(buf[(2, 0)].fg, Color::Rgb(0, 0, 255));
        assert_eq!(buf[(3, 1)].bg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn test_half_block_image_keeps_aspect_ratio() {
        let image = RgbImage::from_pixel(2, 1, image::Rgb([0, 255, 0]));
        let area = Rect::new(0, 0, 8, 4);
        let mut buf = Buffer::empty(area);

        HalfBlockImage::new(&image).render(area, &mut buf);

        // 8x8 pixel box, 2:1 image -> 8 columns by 4 pixel rows = 2 cell rows
        assert_eq!(buf[(0, 0)].symbol(), " ");
        assert_eq!(buf[(0, 1)].fg, Color::Rgb(0, 255, 0));
        assert_eq!(buf[(7, 2)].bg, Color::Rgb(0, 255, 0));
        assert_eq!(buf[(0, 3)].symbol(), " ");
    }

    #[rstest::rstest]
    #[case(0, Some(Rect::new(10, 0, 20, 5)))]
    #[case(5, Some(Rect::new(15, 0, 15, 5)))]
    #[case(-5, Some(Rect::new(10, 0, 15, 5)))]
    #[case(20, None)]
    #[case(-25, None)]
    fn test_shifted_rect(#[case] shift: i32, #[case] expected: Option<Rect>) {
        assert_eq!(shifted_rect(Rect::new(10, 0, 20, 5), shift), expected);
    }
}
