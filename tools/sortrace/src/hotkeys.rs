use crate::input::{generate_array, Distribution, SizePolicy};
use crate::snapshot::Value;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: char,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Quit,
    Sort,
    SelectDistribution(Distribution),
    SelectSize(SizePolicy),
}

pub const CONTROL_BINDINGS: [HotkeyBinding; 8] = [
    HotkeyBinding {
        key: '1',
        action: "random",
    },
    HotkeyBinding {
        key: '2',
        action: "reversed",
    },
    HotkeyBinding {
        key: '3',
        action: "almost sorted",
    },
    HotkeyBinding {
        key: 'l',
        action: "low",
    },
    HotkeyBinding {
        key: 'm',
        action: "medium",
    },
    HotkeyBinding {
        key: 'h',
        action: "high",
    },
    HotkeyBinding {
        key: 's',
        action: "sort",
    },
    HotkeyBinding {
        key: 'q',
        action: "quit",
    },
];

pub fn controls_legend() -> String {
    let parts = CONTROL_BINDINGS
        .iter()
        .map(|binding| format!("{} {}", binding.key, binding.action))
        .collect::<Vec<_>>();
    format!("Keys: {}", parts.join("  "))
}

pub fn action_for_key(key: char) -> Option<HotkeyAction> {
    match key.to_ascii_lowercase() {
        'q' => Some(HotkeyAction::Quit),
        's' => Some(HotkeyAction::Sort),
        '1' => Some(HotkeyAction::SelectDistribution(Distribution::Random)),
        '2' => Some(HotkeyAction::SelectDistribution(Distribution::Reversed)),
        '3' => Some(HotkeyAction::SelectDistribution(Distribution::AlmostSorted)),
        'l' => Some(HotkeyAction::SelectSize(SizePolicy::Low)),
        'm' => Some(HotkeyAction::SelectSize(SizePolicy::Medium)),
        'h' => Some(HotkeyAction::SelectSize(SizePolicy::High)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEffect {
    None,
    Regenerated,
    StartSort,
    SortRefused,
    Quit,
}

/// Selections and the array both lanes start from.
///
/// Any selection change regenerates the array; sorting is refused while a
/// run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPanel {
    pub distribution: Distribution,
    pub size: SizePolicy,
    pub array: Vec<Value>,
}

impl ControlPanel {
    pub fn new<R: Rng + ?Sized>(distribution: Distribution, size: SizePolicy, rng: &mut R) -> Self {
        Self {
            distribution,
            size,
            array: generate_array(distribution, size, rng),
        }
    }

    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        action: HotkeyAction,
        busy: bool,
        rng: &mut R,
    ) -> PanelEffect {
        match action {
            HotkeyAction::Quit => PanelEffect::Quit,
            HotkeyAction::Sort if busy => PanelEffect::SortRefused,
            HotkeyAction::Sort => PanelEffect::StartSort,
            // The lanes are showing a live run; leave its array alone.
            HotkeyAction::SelectDistribution(_) | HotkeyAction::SelectSize(_) if busy => {
                PanelEffect::None
            }
            HotkeyAction::SelectDistribution(distribution) => {
                self.distribution = distribution;
                self.regenerate(rng);
                PanelEffect::Regenerated
            }
            HotkeyAction::SelectSize(size) => {
                self.size = size;
                self.regenerate(rng);
                PanelEffect::Regenerated
            }
        }
    }

    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.array = generate_array(self.distribution, self.size, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::{action_for_key, controls_legend, ControlPanel, HotkeyAction, PanelEffect};
    use crate::input::{Distribution, SizePolicy};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(action_for_key('q'), Some(HotkeyAction::Quit));
        assert_eq!(action_for_key('S'), Some(HotkeyAction::Sort));
        assert_eq!(
            action_for_key('3'),
            Some(HotkeyAction::SelectDistribution(Distribution::AlmostSorted))
        );
        assert_eq!(
            action_for_key('h'),
            Some(HotkeyAction::SelectSize(SizePolicy::High))
        );
        assert_eq!(action_for_key('x'), None);
    }

    #[test]
    fn legend_lists_every_binding() {
        let legend = controls_legend();
        assert!(legend.starts_with("Keys: 1 random"));
        assert!(legend.ends_with("q quit"));
    }

    #[test]
    fn selection_changes_regenerate_the_array() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut panel = ControlPanel::new(Distribution::Random, SizePolicy::Low, &mut rng);
        assert_eq!(panel.array.len(), 10);

        let effect = panel.apply(
            HotkeyAction::SelectSize(SizePolicy::Medium),
            false,
            &mut rng,
        );
        assert_eq!(effect, PanelEffect::Regenerated);
        assert_eq!(panel.array.len(), 50);

        panel.apply(
            HotkeyAction::SelectDistribution(Distribution::Reversed),
            false,
            &mut rng,
        );
        assert_eq!(panel.array.first(), Some(&50));
    }

    #[test]
    fn sort_is_refused_while_busy() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut panel = ControlPanel::new(Distribution::Reversed, SizePolicy::Low, &mut rng);
        let before = panel.clone();

        assert_eq!(panel.apply(HotkeyAction::Sort, true, &mut rng), PanelEffect::SortRefused);
        assert_eq!(
            panel.apply(HotkeyAction::SelectSize(SizePolicy::High), true, &mut rng),
            PanelEffect::None
        );
        assert_eq!(panel, before);
        assert_eq!(panel.apply(HotkeyAction::Sort, false, &mut rng), PanelEffect::StartSort);
    }
}
