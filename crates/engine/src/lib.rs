//! Filtering, tag aggregation and rendering over an in-memory catalog.
//!
//! Everything here is pure with respect to the catalog: no I/O, no UI toolkit.
//! The only stateful piece is [`render::CarouselHost`], which tracks whether the
//! external slider widget is currently mounted.

pub mod filter;
pub mod highlight;
pub mod render;
pub mod tags;

pub use filter::{Filtered, apply, matches_search, search, sort_books};
pub use highlight::{Highlighter, Segment};
pub use render::{
    BookCard, Breakpoint, Carousel, CarouselConfig, CarouselHost, EMPTY_MESSAGE, RenderedView,
    Renderer, render_cards,
};
pub use tags::{TagButton, TagCount, TagPanel, count_tags, tag_panel};
