//! Turns a filtered book list into display units and drives the carousel.

use std::fmt::Write as _;

use catalog_core::{Book, Favorites};

use crate::highlight::{Highlighter, Segment};

pub const EMPTY_MESSAGE: &str = "No books found with the selected filters.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCard {
    pub name: String,
    pub title: Vec<Segment>,
    pub year: String,
    pub description: Vec<Segment>,
    pub tags: Vec<Segment>,
    pub image: String,
    pub link: String,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedView {
    Empty { message: String },
    Cards(Vec<BookCard>),
}

impl RenderedView {
    pub fn cards(&self) -> &[BookCard] {
        match self {
            RenderedView::Empty { .. } => &[],
            RenderedView::Cards(cards) => cards,
        }
    }

    pub fn slide_count(&self) -> usize {
        self.cards().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RenderedView::Empty { .. })
    }

    pub fn to_html(&self) -> String {
        let cards = match self {
            RenderedView::Empty { message } => {
                return format!("<p class=\"nenhum-resultado\">{}</p>", escape_html(message));
            }
            RenderedView::Cards(cards) => cards,
        };

        let mut out = String::new();
        for card in cards {
            let name = escape_html(&card.name);
            let favorite_class = if card.favorite { "favorito ativo" } else { "favorito" };
            let _ = write!(
                out,
                "<div class=\"swiper-slide\">\
                 <article class=\"card\">\
                 <h2>{title}</h2>\
                 <p class=\"ano-publicacao\">{year}</p>\
                 <p>{description}</p>\
                 <div class=\"tags\">{tags}</div>\
                 <button class=\"{favorite_class}\" data-nome=\"{name}\">\u{2605}</button>\
                 <button class=\"detalhes\" data-nome=\"{name}\">Details</button>\
                 <a href=\"{link}\" target=\"_blank\">Learn more</a>\
                 </article>\
                 </div>\n",
                title = segments_to_html(&card.title),
                year = escape_html(&card.year),
                description = segments_to_html(&card.description),
                tags = segments_to_html(&card.tags),
                link = escape_html(&card.link),
            );
        }
        out
    }
}

/// Builds one card per book, in order. An empty list yields the placeholder.
pub fn render_cards(books: &[&Book], term: &str, favorites: &Favorites) -> RenderedView {
    if books.is_empty() {
        return RenderedView::Empty {
            message: EMPTY_MESSAGE.to_string(),
        };
    }

    let highlighter = Highlighter::new(term);
    let cards = books
        .iter()
        .map(|book| BookCard {
            name: book.name.clone(),
            title: highlighter.segments(&book.name),
            year: book.release_year.clone(),
            description: highlighter.segments(&book.description),
            tags: highlighter.segments(&book.joined_tags(", ")),
            image: book.image.clone(),
            link: book.link.clone(),
            favorite: favorites.contains(&book.name),
        })
        .collect();
    RenderedView::Cards(cards)
}

pub fn segments_to_html(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        if segment.marked {
            out.push_str("<mark>");
            out.push_str(&escape_html(&segment.text));
            out.push_str("</mark>");
        } else {
            out.push_str(&escape_html(&segment.text));
        }
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    /// Container width (terminal columns) from which this entry applies.
    pub min_width: u16,
    pub slides_per_view: usize,
    pub spacing: u16,
}

pub const DEFAULT_BREAKPOINTS: [Breakpoint; 3] = [
    Breakpoint {
        min_width: 0,
        slides_per_view: 1,
        spacing: 2,
    },
    Breakpoint {
        min_width: 80,
        slides_per_view: 2,
        spacing: 3,
    },
    Breakpoint {
        min_width: 120,
        slides_per_view: 3,
        spacing: 3,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselConfig {
    pub slide_count: usize,
    pub loop_slides: bool,
    pub breakpoints: Vec<Breakpoint>,
}

impl CarouselConfig {
    pub fn for_slides(slide_count: usize, breakpoints: &[Breakpoint]) -> Self {
        Self {
            slide_count,
            loop_slides: slide_count > 3,
            breakpoints: breakpoints.to_vec(),
        }
    }

    pub fn breakpoint_for(&self, width: u16) -> Breakpoint {
        self.breakpoints
            .iter()
            .filter(|bp| bp.min_width <= width)
            .max_by_key(|bp| bp.min_width)
            .copied()
            .unwrap_or(DEFAULT_BREAKPOINTS[0])
    }

    pub fn slides_per_view(&self, width: u16) -> usize {
        self.breakpoint_for(width)
            .slides_per_view
            .clamp(1, self.slide_count.max(1))
    }
}

/// The slider widget the rendered cards are handed to.
pub trait Carousel {
    fn mount(&mut self, config: &CarouselConfig);
    fn destroy(&mut self);
}

/// Owns the carousel and enforces its lifecycle: destroy before every
/// re-mount, and never mount with zero slides.
#[derive(Debug)]
pub struct CarouselHost<C> {
    widget: C,
    live: bool,
    breakpoints: Vec<Breakpoint>,
}

impl<C: Carousel> CarouselHost<C> {
    pub fn new(widget: C) -> Self {
        Self::with_breakpoints(widget, &DEFAULT_BREAKPOINTS)
    }

    pub fn with_breakpoints(widget: C, breakpoints: &[Breakpoint]) -> Self {
        Self {
            widget,
            live: false,
            breakpoints: breakpoints.to_vec(),
        }
    }

    pub fn refresh(&mut self, slide_count: usize) {
        if self.live {
            self.widget.destroy();
            self.live = false;
        }
        if slide_count == 0 {
            return;
        }
        let config = CarouselConfig::for_slides(slide_count, &self.breakpoints);
        self.widget.mount(&config);
        self.live = true;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn widget(&self) -> &C {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut C {
        &mut self.widget
    }
}

#[derive(Debug)]
pub struct Renderer<C> {
    host: CarouselHost<C>,
}

impl<C: Carousel> Renderer<C> {
    pub fn new(widget: C) -> Self {
        Self {
            host: CarouselHost::new(widget),
        }
    }

    pub fn draw(&mut self, books: &[&Book], term: &str, favorites: &Favorites) -> RenderedView {
        let view = render_cards(books, term, favorites);
        self.host.refresh(view.slide_count());
        view
    }

    pub fn carousel(&self) -> &CarouselHost<C> {
        &self.host
    }

    pub fn carousel_mut(&mut self) -> &mut CarouselHost<C> {
        &mut self.host
    }
}
