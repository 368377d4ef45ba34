use catalog_engine::{Carousel, CarouselConfig};

/// Terminal stand-in for the card carousel: a window of `slides_per_view`
/// cards starting at `position`.
#[derive(Debug, Default)]
pub(crate) struct Slider {
    config: Option<CarouselConfig>,
    position: usize,
}

impl Carousel for Slider {
    fn mount(&mut self, config: &CarouselConfig) {
        self.config = Some(config.clone());
        self.position = 0;
    }

    fn destroy(&mut self) {
        self.config = None;
        self.position = 0;
    }
}

impl Slider {
    pub(crate) fn is_mounted(&self) -> bool {
        self.config.is_some()
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn spacing(&self, width: u16) -> u16 {
        self.config
            .as_ref()
            .map(|config| config.breakpoint_for(width).spacing)
            .unwrap_or(0)
    }

    /// Card indices shown at `width`, left to right.
    pub(crate) fn window(&self, width: u16) -> Vec<usize> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        let count = config.slide_count;
        let per_view = config.slides_per_view(width);
        if config.loop_slides {
            (0..per_view).map(|i| (self.position + i) % count).collect()
        } else {
            (self.position..(self.position + per_view).min(count)).collect()
        }
    }

    pub(crate) fn next(&mut self, width: u16) {
        let Some(config) = &self.config else {
            return;
        };
        let count = config.slide_count;
        if config.loop_slides {
            self.position = (self.position + 1) % count;
        } else {
            let last_start = count.saturating_sub(config.slides_per_view(width));
            self.position = (self.position + 1).min(last_start);
        }
    }

    pub(crate) fn prev(&mut self) {
        let Some(config) = &self.config else {
            return;
        };
        let count = config.slide_count;
        if config.loop_slides {
            self.position = (self.position + count - 1) % count;
        } else {
            self.position = self.position.saturating_sub(1);
        }
    }
}
