// Certificate PDF generation
// Uses genpdf - requires Liberation, DejaVu or similar fonts in standard paths
mod background;

use genpdf::elements::Image as PdfImage;
use genpdf::error::{Error as PdfError, ErrorKind as PdfErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::render::Area;
use genpdf::style::{Color, Style};
use genpdf::{Context, Element, Mm, Position, RenderResult, Scale, Size};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::certificates::CertificateData;
use crate::db::TemplateLayout;
use crate::error::{AppError, AppResult};

/// A4 landscape.
pub const PAGE_WIDTH_MM: f64 = 297.0;
pub const PAGE_HEIGHT_MM: f64 = 210.0;

const COLUMN_WIDTH_MM: f64 = 200.0;
const NAME_ANCHOR: f64 = 0.52;
const COURSE_ANCHOR: f64 = 0.72;
// 25pt above the bottom edge.
const ID_BOTTOM_MARGIN_MM: f64 = 25.0 * 25.4 / 72.0;
const BACKGROUND_DPI: f64 = 300.0;

const NAME_FONT_SIZE: u8 = 36;
const COURSE_FONT_SIZE: u8 = 24;
const ID_FONT_SIZE: u8 = 10;
const MIN_FONT_SIZE: u8 = 8;

pub const CERTIFICATE_ID_LABEL: &str = "Certificate ID: ";

const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
];

// Family name, then the regular, bold, italic and bold-italic file suffixes.
const FONT_FACES: &[(&str, [&str; 4])] = &[
    ("LiberationSans", ["-Regular", "-Bold", "-Italic", "-BoldItalic"]),
    ("DejaVuSans", ["", "-Bold", "-Oblique", "-BoldOblique"]),
    ("Arial", ["", " Bold", " Italic", " Bold Italic"]),
];

pub trait CertificateRenderer: Send + Sync {
    fn render(
        &self,
        data: &CertificateData,
        template: &[u8],
        layout: TemplateLayout,
    ) -> AppResult<Vec<u8>>;
}

pub struct PdfRenderer {
    fonts: FontFamily<FontData>,
}

impl PdfRenderer {
    /// `font_dir` is searched before the system font directories.
    pub fn new(font_dir: Option<&Path>) -> Result<Self, String> {
        let dirs: Vec<PathBuf> = font_dir
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_DIRS.iter().map(PathBuf::from))
            .filter(|p| p.exists())
            .collect();

        let fonts = dirs
            .iter()
            .find_map(|dir| {
                FONT_FACES
                    .iter()
                    .find_map(|(name, suffixes)| load_family(dir, name, suffixes))
            })
            .ok_or_else(|| {
                "No suitable fonts found. Install: apt install fonts-liberation".to_string()
            })?;

        Ok(Self { fonts })
    }
}

fn load_family(dir: &Path, name: &str, suffixes: &[&str; 4]) -> Option<FontFamily<FontData>> {
    let load = |suffix: &str| {
        FontData::load(dir.join(format!("{}{}.ttf", name, suffix)), None).ok()
    };
    Some(FontFamily {
        regular: load(suffixes[0])?,
        bold: load(suffixes[1])?,
        italic: load(suffixes[2])?,
        bold_italic: load(suffixes[3])?,
    })
}

impl CertificateRenderer for PdfRenderer {
    fn render(
        &self,
        data: &CertificateData,
        template: &[u8],
        layout: TemplateLayout,
    ) -> AppResult<Vec<u8>> {
        let bg = background::prepare(template)?;
        let natural_w = bg.width_px as f64 * 25.4 / BACKGROUND_DPI;
        let natural_h = bg.height_px as f64 * 25.4 / BACKGROUND_DPI;

        let mut image = PdfImage::from_reader(Cursor::new(bg.png))
            .map_err(|e| AppError::internal(format!("template embed failed: {}", e)))?;
        image.set_dpi(BACKGROUND_DPI);
        let image = image
            .with_position(Position::default())
            .with_scale(Scale::new(
                PAGE_WIDTH_MM / natural_w,
                PAGE_HEIGHT_MM / natural_h,
            ));

        let mut doc = genpdf::Document::new(self.fonts.clone());
        doc.set_title(format!("Certificate {}", data.certificate_id));
        doc.set_paper_size(Size::new(PAGE_WIDTH_MM, PAGE_HEIGHT_MM));
        doc.push(CertificatePage {
            background: image,
            lines: overlay_lines(data, layout),
        });

        let mut out = Vec::new();
        doc.render(&mut out)
            .map_err(|e| AppError::internal(format!("pdf render failed: {}", e)))?;
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OverlayLine {
    text: String,
    // Bottom of the line, measured from the top of the page.
    anchor_mm: f64,
    font_size: u8,
    bold: bool,
    muted: bool,
}

impl OverlayLine {
    fn style(&self, font_size: u8) -> Style {
        let mut style = Style::new().with_font_size(font_size);
        if self.bold {
            style = style.bold();
        }
        if self.muted {
            style = style.with_color(Color::Rgb(110, 110, 110));
        }
        style
    }
}

fn overlay_lines(data: &CertificateData, layout: TemplateLayout) -> Vec<OverlayLine> {
    let mut lines = Vec::with_capacity(3);
    if layout.show_user_name {
        lines.push(OverlayLine {
            text: data.user_name.clone(),
            anchor_mm: PAGE_HEIGHT_MM * NAME_ANCHOR,
            font_size: NAME_FONT_SIZE,
            bold: true,
            muted: false,
        });
    }
    if layout.show_course_name {
        lines.push(OverlayLine {
            text: data.course_name.clone(),
            anchor_mm: PAGE_HEIGHT_MM * COURSE_ANCHOR,
            font_size: COURSE_FONT_SIZE,
            bold: true,
            muted: false,
        });
    }
    if layout.show_certificate_id {
        lines.push(OverlayLine {
            text: format!("{}{}", CERTIFICATE_ID_LABEL, data.certificate_id),
            anchor_mm: PAGE_HEIGHT_MM - ID_BOTTOM_MARGIN_MM,
            font_size: ID_FONT_SIZE,
            bold: false,
            muted: true,
        });
    }
    lines
}

// Centered in the column, never left of the page edge.
fn line_x(width: Mm) -> Mm {
    let column = Mm::from(COLUMN_WIDTH_MM);
    let column_left = Mm::from((PAGE_WIDTH_MM - COLUMN_WIDTH_MM) / 2.0);
    (column_left + (column - width) / 2.0).max(Mm::from(0.0))
}

struct CertificatePage {
    background: PdfImage,
    lines: Vec<OverlayLine>,
}

impl Element for CertificatePage {
    fn render(
        &mut self,
        context: &Context,
        area: Area<'_>,
        style: Style,
    ) -> Result<RenderResult, PdfError> {
        self.background.render(context, area.clone(), style)?;

        let column = Mm::from(COLUMN_WIDTH_MM);
        for line in &self.lines {
            // Shrink until the line fits the column.
            let mut size = line.font_size;
            let mut line_style = line.style(size);
            while size > MIN_FONT_SIZE && line_style.str_width(&context.font_cache, &line.text) > column {
                size -= 1;
                line_style = line.style(size);
            }

            let x = line_x(line_style.str_width(&context.font_cache, &line.text));
            let y = Mm::from(line.anchor_mm) - line_style.line_height(&context.font_cache);
            let printed =
                area.print_str(&context.font_cache, Position::new(x, y), line_style, &line.text)?;
            if !printed {
                return Err(PdfError::new(
                    format!("overlay does not fit on the page: {}", line.text),
                    PdfErrorKind::PageSizeExceeded,
                ));
            }
        }

        Ok(RenderResult {
            size: area.size(),
            has_more: false,
        })
    }
}
