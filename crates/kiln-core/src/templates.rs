//! Quick-start prompts offered to new users.

/// A label and the prompt it submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_ACTIONS: [QuickAction; 8] = [
    QuickAction {
        label: "Todo App",
        prompt: "Build a beautiful todo app with drag and drop, categories, and dark mode",
    },
    QuickAction {
        label: "Calculator",
        prompt: "Create a scientific calculator with advanced functions and beautiful UI",
    },
    QuickAction {
        label: "Game",
        prompt: "Build an interactive tic-tac-toe game with score tracking and smooth animations",
    },
    QuickAction {
        label: "E-commerce",
        prompt: "Create a product showcase page with cart, filters, and checkout flow",
    },
    QuickAction {
        label: "Music Player",
        prompt: "Build a music player interface with playlist, controls, and visualizer",
    },
    QuickAction {
        label: "Gallery",
        prompt: "Create a photo gallery with masonry layout, lightbox, and filters",
    },
    QuickAction {
        label: "Dashboard",
        prompt: "Build an analytics dashboard with charts, metrics cards, and data tables",
    },
    QuickAction {
        label: "Portfolio",
        prompt: "Create a stunning portfolio website with projects showcase and contact form",
    },
];

/// Case-insensitive lookup by label.
pub fn find_quick_action(label: &str) -> Option<&'static QuickAction> {
    QUICK_ACTIONS
        .iter()
        .find(|action| action.label.eq_ignore_ascii_case(label.trim()))
}
