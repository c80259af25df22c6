/// Quotes shown beneath the countdown, in rotation order.
pub const QUOTES: &[&str] = &[
    "How I miss home...",
    "Home soon!",
    "Just a little longer...",
    "Every day at sea is a day closer to home",
    "The horizon is calling us home",
    "Counting the days, counting the waves",
    "Home, sweet home!",
    "A few more waves and we're home!",
    "The sea is beautiful, but home is better",
    "Counting seagulls until home",
    "Hot tea and a sofa are near!",
    "The thought of home keeps me warm at sea",
    "Just a bit more and I'm home!",
    "The sails are full of a fair wind!",
    "Land on the horizon! (not yet)",
];

/// Cycles through [`QUOTES`], starting at the first.
#[derive(Debug, Clone, Default)]
pub struct QuoteRotator {
    index: usize,
}

impl QuoteRotator {
    pub fn current(&self) -> &'static str {
        QUOTES[self.index]
    }

    /// Advance to the next quote, wrapping at the end, and return it.
    pub fn advance(&mut self) -> &'static str {
        self.index = (self.index + 1) % QUOTES.len();
        self.current()
    }
}
