//! Stamp placement.
//!
//! Every position type turns into one [`StampAnnot`] per page fragment. The
//! boundary always has the full seal size; the clip, expressed relative to
//! the boundary, selects the part of the image that lands on the page.

use super::document::OfdDocument;
use super::id::SignIdProvider;
use super::records::StampAnnot;
use crate::error::{Error, Result};
use crate::geometry::StBox;

/// Page edge a riding stamp straddles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// Left edge
    Left,
    /// Right edge
    #[default]
    Right,
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
}

impl Side {
    fn is_horizontal(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Where a signature's seal appears.
pub trait StampAppearance: std::fmt::Debug {
    /// Annotations for `doc`, with IDs drawn from `ids`.
    fn appearance(&self, doc: &OfdDocument, ids: &mut dyn SignIdProvider) -> Result<Vec<StampAnnot>>;
}

fn check_size(width: f64, height: f64) -> Result<()> {
    if !(width > 0.0 && height > 0.0) {
        return Err(Error::InvalidArgument(format!(
            "Stamp size must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn annot(
    doc: &OfdDocument,
    ids: &mut dyn SignIdProvider,
    page: usize,
    boundary: StBox,
    clip: Option<StBox>,
) -> Result<StampAnnot> {
    Ok(StampAnnot {
        id: ids.increment_and_get()?,
        page_ref: doc.page_object_id(page)?.to_string(),
        boundary,
        clip,
    })
}

/// A stamp at an explicit position on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalStampPos {
    /// 1-based page index
    pub page: usize,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Seal width
    pub width: f64,
    /// Seal height
    pub height: f64,
}

impl NormalStampPos {
    /// Stamp of `width` x `height` at (`x`, `y`) on `page`.
    pub fn new(page: usize, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            page,
            x,
            y,
            width,
            height,
        }
    }
}

impl StampAppearance for NormalStampPos {
    fn appearance(&self, doc: &OfdDocument, ids: &mut dyn SignIdProvider) -> Result<Vec<StampAnnot>> {
        check_size(self.width, self.height)?;
        let boundary = StBox::new(self.x, self.y, self.width, self.height);
        Ok(vec![annot(doc, ids, self.page, boundary, None)?])
    }
}

/// A seal split evenly across every page of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RidingStampPos {
    /// Edge the seal straddles
    pub side: Side,
    /// Position along the edge; centred when absent
    pub offset: Option<f64>,
    /// Seal width
    pub width: f64,
    /// Seal height
    pub height: f64,
}

impl RidingStampPos {
    /// Riding stamp on `side`, centred along the edge.
    pub fn new(side: Side, width: f64, height: f64) -> Self {
        Self {
            side,
            offset: None,
            width,
            height,
        }
    }

    /// Place the seal at `offset` along the edge.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl StampAppearance for RidingStampPos {
    fn appearance(&self, doc: &OfdDocument, ids: &mut dyn SignIdProvider) -> Result<Vec<StampAnnot>> {
        check_size(self.width, self.height)?;
        let n = doc.page_count();
        if n == 0 {
            return Err(Error::InvalidArgument("Document has no pages".to_string()));
        }

        let mut res = Vec::with_capacity(n);
        for i in 0..n {
            let page = doc.page_size(i + 1)?;
            let k = i as f64;
            let rest = (n - 1 - i) as f64;
            let (boundary, clip) = if self.side.is_horizontal() {
                let item = self.width / n as f64;
                let y = self
                    .offset
                    .unwrap_or(page.height / 2.0 - self.height / 2.0);
                let (x, clip_x) = match self.side {
                    Side::Right => (page.width - item * (k + 1.0), k * item),
                    _ => (-item * rest, rest * item),
                };
                (
                    StBox::new(x, y, self.width, self.height),
                    StBox::new(clip_x, 0.0, item, self.height),
                )
            } else {
                let item = self.height / n as f64;
                let x = self.offset.unwrap_or(page.width / 2.0 - self.width / 2.0);
                let (y, clip_y) = match self.side {
                    Side::Bottom => (page.height - item * (k + 1.0), k * item),
                    _ => (-item * rest, rest * item),
                };
                (
                    StBox::new(x, y, self.width, self.height),
                    StBox::new(0.0, clip_y, self.width, item),
                )
            };
            res.push(annot(doc, ids, i + 1, boundary, Some(clip))?);
        }
        Ok(res)
    }
}

/// A seal cut in two at every boundary between adjacent pages of a run.
///
/// For each pair of adjacent pages the earlier page shows the leading part
/// of the image flush against the shared edge and the later page shows the
/// rest. The first page of the run only receives a leading part, the last
/// only a trailing part, and pages in between receive one of each.
#[derive(Debug, Clone, PartialEq)]
pub struct CuttingRideStampPos {
    /// Edge the seal straddles
    pub side: Side,
    /// Position along the edge; centred when absent
    pub offset: Option<f64>,
    /// Seal width
    pub width: f64,
    /// Seal height
    pub height: f64,
    /// Inset of the visible parts from the page edge
    pub margin: f64,
    /// Share of the seal on the earlier page, per page pair; 0.5 when empty
    pub ratios: Vec<f64>,
    /// 1-based pages of the run; every page when absent
    pub pages: Option<Vec<usize>>,
}

impl CuttingRideStampPos {
    /// Cutting stamp on `side` across every page, split 50/50.
    pub fn new(side: Side, width: f64, height: f64) -> Self {
        Self {
            side,
            offset: None,
            width,
            height,
            margin: 0.0,
            ratios: Vec::new(),
            pages: None,
        }
    }

    /// Place the seal at `offset` along the edge.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Inset the visible parts by `margin`.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Per-pair split ratios; entry `i` is the share left on the `i`th page.
    pub fn with_ratios(mut self, ratios: Vec<f64>) -> Self {
        self.ratios = ratios;
        self
    }

    /// Restrict the run to `pages`, in order.
    pub fn with_pages(mut self, pages: Vec<usize>) -> Self {
        self.pages = Some(pages);
        self
    }

    fn run(&self, doc: &OfdDocument) -> Result<Vec<usize>> {
        let run = match &self.pages {
            Some(pages) => pages.clone(),
            None => (1..=doc.page_count()).collect(),
        };
        if run.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "A cutting stamp needs at least two pages, got {}",
                run.len()
            )));
        }
        if !self.ratios.is_empty() && self.ratios.len() != run.len() - 1 {
            return Err(Error::InvalidArgument(format!(
                "Expected {} split ratios for {} pages, got {}",
                run.len() - 1,
                run.len(),
                self.ratios.len()
            )));
        }
        if let Some(bad) = self.ratios.iter().find(|r| !(**r > 0.0 && **r < 1.0)) {
            return Err(Error::InvalidArgument(format!(
                "Split ratio {} outside (0, 1)",
                bad
            )));
        }
        Ok(run)
    }

    fn ratio(&self, pair: usize) -> f64 {
        self.ratios.get(pair).copied().unwrap_or(0.5)
    }

    /// Boundary and clip of the part of the seal that ends at the shared edge.
    fn leading(&self, page: StBox, share: f64) -> (StBox, StBox) {
        let (w, h, m) = (self.width, self.height, self.margin);
        match self.side {
            Side::Right => {
                let a = w * share;
                let y = self.offset.unwrap_or(page.height / 2.0 - h / 2.0);
                (StBox::new(page.width - a - m, y, w, h), StBox::new(0.0, 0.0, a, h))
            }
            Side::Left => {
                let a = w * share;
                let y = self.offset.unwrap_or(page.height / 2.0 - h / 2.0);
                (StBox::new(-(w - a) + m, y, w, h), StBox::new(w - a, 0.0, a, h))
            }
            Side::Bottom => {
                let a = h * share;
                let x = self.offset.unwrap_or(page.width / 2.0 - w / 2.0);
                (StBox::new(x, page.height - a - m, w, h), StBox::new(0.0, 0.0, w, a))
            }
            Side::Top => {
                let a = h * share;
                let x = self.offset.unwrap_or(page.width / 2.0 - w / 2.0);
                (StBox::new(x, -(h - a) + m, w, h), StBox::new(0.0, h - a, w, a))
            }
        }
    }

    /// Boundary and clip of the part of the seal that starts at the shared edge.
    fn trailing(&self, page: StBox, share: f64) -> (StBox, StBox) {
        let (w, h, m) = (self.width, self.height, self.margin);
        match self.side {
            Side::Right => {
                let b = w * share;
                let y = self.offset.unwrap_or(page.height / 2.0 - h / 2.0);
                (StBox::new(-(w - b) + m, y, w, h), StBox::new(w - b, 0.0, b, h))
            }
            Side::Left => {
                let b = w * share;
                let y = self.offset.unwrap_or(page.height / 2.0 - h / 2.0);
                (StBox::new(page.width - b - m, y, w, h), StBox::new(0.0, 0.0, b, h))
            }
            Side::Bottom => {
                let b = h * share;
                let x = self.offset.unwrap_or(page.width / 2.0 - w / 2.0);
                (StBox::new(x, -(h - b) + m, w, h), StBox::new(0.0, h - b, w, b))
            }
            Side::Top => {
                let b = h * share;
                let x = self.offset.unwrap_or(page.width / 2.0 - w / 2.0);
                (StBox::new(x, page.height - b - m, w, h), StBox::new(0.0, 0.0, w, b))
            }
        }
    }
}

impl StampAppearance for CuttingRideStampPos {
    fn appearance(&self, doc: &OfdDocument, ids: &mut dyn SignIdProvider) -> Result<Vec<StampAnnot>> {
        check_size(self.width, self.height)?;
        let run = self.run(doc)?;
        let last = run.len() - 1;

        let mut res = Vec::with_capacity(2 * last);
        for (i, &page_index) in run.iter().enumerate() {
            let page = doc.page_size(page_index)?;
            if i != last {
                let (boundary, clip) = self.leading(page, self.ratio(i));
                res.push(annot(doc, ids, page_index, boundary, Some(clip))?);
            }
            if i != 0 {
                let (boundary, clip) = self.trailing(page, 1.0 - self.ratio(i - 1));
                res.push(annot(doc, ids, page_index, boundary, Some(clip))?);
            }
        }
        Ok(res)
    }
}
