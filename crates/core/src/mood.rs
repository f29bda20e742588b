use crate::controller::Action;

pub const MOOD_MIN: u8 = 0;
pub const MOOD_MAX: u8 = 100;
pub const DEFAULT_MOOD: u8 = 50;

/// A single clamped mood counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodMeter(u8);

impl MoodMeter {
    pub fn new(value: i32) -> Self {
        Self(value.clamp(MOOD_MIN as i32, MOOD_MAX as i32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Moves the meter by `delta`, clamping immediately.
    pub fn adjust(&mut self, delta: i32) {
        *self = Self::new(self.0 as i32 + delta);
    }
}

impl Default for MoodMeter {
    fn default() -> Self {
        Self(DEFAULT_MOOD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meter {
    Happiness,
    Love,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodDelta {
    pub meter: Meter,
    pub amount: i32,
}

impl MoodDelta {
    const fn new(meter: Meter, amount: i32) -> Self {
        Self { meter, amount }
    }
}

// Substring triggers, checked case-insensitively in this order.
const KEYWORD_DELTAS: [(&str, MoodDelta); 3] = [
    ("ignore", MoodDelta::new(Meter::Happiness, -15)),
    ("bad", MoodDelta::new(Meter::Love, -10)),
    ("hate", MoodDelta::new(Meter::Love, -20)),
];

/// The fixed delta an action earns, if any.
pub fn action_delta(action: Action) -> Option<MoodDelta> {
    match action {
        Action::Feed => Some(MoodDelta::new(Meter::Happiness, 10)),
        Action::Play => Some(MoodDelta::new(Meter::Happiness, 15)),
        Action::Sleep => Some(MoodDelta::new(Meter::Happiness, 5)),
        Action::Clean => Some(MoodDelta::new(Meter::Love, 10)),
        Action::Love => Some(MoodDelta::new(Meter::Love, 20)),
        Action::Send | Action::Speak => None,
    }
}

pub fn keyword_deltas(text: &str) -> Vec<MoodDelta> {
    let lowered = text.to_lowercase();
    KEYWORD_DELTAS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, delta)| *delta)
        .collect()
}

/// Every delta one call applies: the action's own delta first, then keyword hits.
pub fn deltas_for(action: Action, text: Option<&str>) -> Vec<MoodDelta> {
    action_delta(action)
        .into_iter()
        .chain(text.map(keyword_deltas).unwrap_or_default())
        .collect()
}

/// The pet's two mood meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mood {
    pub happiness: MoodMeter,
    pub love: MoodMeter,
}

impl Mood {
    pub fn new(happiness: i32, love: i32) -> Self {
        Self {
            happiness: MoodMeter::new(happiness),
            love: MoodMeter::new(love),
        }
    }

    /// Applies deltas one at a time; each step is clamped on its own.
    pub fn apply(&mut self, deltas: &[MoodDelta]) {
        for delta in deltas {
            let meter = match delta.meter {
                Meter::Happiness => &mut self.happiness,
                Meter::Love => &mut self.love,
            };
            meter.adjust(delta.amount);
            tracing::debug!(
                "Mood {:?} {:+} -> {}",
                delta.meter,
                delta.amount,
                meter.value()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_clamps_instead_of_wrapping() {
        let mut meter = MoodMeter::new(95);
        meter.adjust(20);
        assert_eq!(meter.value(), 100);
        meter.adjust(-250);
        assert_eq!(meter.value(), 0);
        assert_eq!(MoodMeter::new(-3).value(), 0);
        assert_eq!(MoodMeter::new(300).value(), 100);
    }

    #[test]
    fn clamping_happens_after_every_step() {
        // 95 + 20 -> 100 (not 115), then -20 -> 80.
        let mut mood = Mood::new(50, 95);
        mood.apply(&[
            MoodDelta::new(Meter::Love, 20),
            MoodDelta::new(Meter::Love, -20),
        ]);
        assert_eq!(mood.love.value(), 80);

        // 10 - 15 -> 0 (not -5), then +10 -> 10.
        let mut mood = Mood::new(10, 50);
        mood.apply(&[
            MoodDelta::new(Meter::Happiness, -15),
            MoodDelta::new(Meter::Happiness, 10),
        ]);
        assert_eq!(mood.happiness.value(), 10);
    }

    #[test]
    fn action_table() {
        assert_eq!(
            action_delta(Action::Feed),
            Some(MoodDelta::new(Meter::Happiness, 10))
        );
        assert_eq!(
            action_delta(Action::Play),
            Some(MoodDelta::new(Meter::Happiness, 15))
        );
        assert_eq!(
            action_delta(Action::Sleep),
            Some(MoodDelta::new(Meter::Happiness, 5))
        );
        assert_eq!(action_delta(Action::Clean), Some(MoodDelta::new(Meter::Love, 10)));
        assert_eq!(action_delta(Action::Love), Some(MoodDelta::new(Meter::Love, 20)));
        assert_eq!(action_delta(Action::Send), None);
        assert_eq!(action_delta(Action::Speak), None);
    }

    #[test]
    fn keywords_are_case_insensitive_and_compose() {
        let deltas = keyword_deltas("Don't IGNORE me, you BAD pet, I Hate this");
        assert_eq!(
            deltas,
            vec![
                MoodDelta::new(Meter::Happiness, -15),
                MoodDelta::new(Meter::Love, -10),
                MoodDelta::new(Meter::Love, -20),
            ]
        );
        assert!(keyword_deltas("what a lovely day").is_empty());
    }

    #[test]
    fn action_delta_comes_before_keywords() {
        let deltas = deltas_for(Action::Love, Some("I hate you"));
        assert_eq!(
            deltas,
            vec![
                MoodDelta::new(Meter::Love, 20),
                MoodDelta::new(Meter::Love, -20),
            ]
        );
        assert!(deltas_for(Action::Send, None).is_empty());
    }

    #[test]
    fn meters_stay_in_range_for_any_sequence() {
        let steps = [37, -90, 15, 15, 15, 100, -7, -100, 3, 60, -15, -20];
        let mut mood = Mood::default();
        for (i, amount) in steps.iter().enumerate() {
            let meter = if i % 2 == 0 { Meter::Happiness } else { Meter::Love };
            mood.apply(&[MoodDelta::new(meter, *amount)]);
            assert!(mood.happiness.value() <= MOOD_MAX);
            assert!(mood.love.value() <= MOOD_MAX);
        }
    }
}
