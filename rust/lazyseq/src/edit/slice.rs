use lazyseq_common::{Error, Offset, Result};

use crate::{
    materializer::{Element, Flavor, Materializer, SharedMaterializer},
    memo::Memo,
};

/// Resolved bounds of a slice, in upstream indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: usize,
    /// Exclusive; `None` extends to the end of the upstream.
    end: Option<usize>,
}

impl Window {
    fn for_size(start: Offset, end: Option<Offset>, size: usize) -> Window {
        let start = start.clamp(size);
        Window {
            start,
            end: Some(end.map_or(size, |end| end.clamp(size)).max(start)),
        }
    }

    /// Maps a slice index onto an upstream index, if it falls inside the window.
    fn upstream_index(&self, index: usize) -> Option<usize> {
        let pos = self.start.checked_add(index)?;
        match self.end {
            Some(end) if pos >= end => None,
            _ => Some(pos),
        }
    }
}

/// The window `[start, end)` of the upstream.
///
/// Bounds counted from the start never force the upstream size: they are applied as
/// is, and indices past the upstream end simply do not exist. Bounds counted from the
/// end are resolved against the upstream size on first need, once.
pub(crate) struct SliceNode<E> {
    source: SharedMaterializer<E>,
    start: Offset,
    end: Option<Offset>,
    window: Memo<Window>,
}

impl<E: Element> SliceNode<E> {
    pub fn new(source: SharedMaterializer<E>, start: Offset, end: Option<Offset>) -> Self {
        SliceNode {
            source,
            start,
            end,
            window: Memo::new("slice"),
        }
    }

    fn window(&self) -> Result<Window> {
        match (self.start, self.end) {
            (Offset::FromStart(start), None) => Ok(Window { start, end: None }),
            (Offset::FromStart(start), Some(Offset::FromStart(end))) => Ok(Window {
                start,
                end: Some(end.max(start)),
            }),
            (start, end) => self
                .window
                .get_or_compute(|| Ok(Window::for_size(start, end, self.source.size()?)))
                .copied(),
        }
    }
}

impl<E: Element> Materializer<E> for SliceNode<E> {
    fn flavor(&self) -> Flavor {
        self.source.flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        match self.window()?.upstream_index(index) {
            Some(pos) => self.source.can_produce(pos),
            None => Ok(false),
        }
    }

    fn get(&self, index: usize) -> Result<E> {
        match self.window()?.upstream_index(index) {
            Some(pos) if self.source.can_produce(pos)? => self.source.get(pos),
            _ => Err(Error::out_of_range(index, self.known_size())),
        }
    }

    fn size(&self) -> Result<usize> {
        let Window { start, end } = self.window()?;
        match end {
            Some(end) if end == start => Ok(0),
            Some(end) if self.source.can_produce(end - 1)? => Ok(end - start),
            _ => Ok(self.source.size()?.saturating_sub(start)),
        }
    }

    fn known_size(&self) -> Option<usize> {
        let size = self.source.known_size()?;
        let Window { start, end } = Window::for_size(self.start, self.end, size);
        end.map(|end| end - start)
    }
}
