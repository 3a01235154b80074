use console::{strip_ansi_codes, Term};
use jobboard_protocol::api::favorites::Favorite;
use jobboard_protocol::api::notifications::Notification;
use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

/// Enhanced UI utilities
pub struct UI {
    term: Term,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Helper method to conditionally apply color based on terminal support
    fn colorize<F>(&self, text: &str, color_fn: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if self.supports_color() {
            color_fn(text)
        } else {
            text.to_string()
        }
    }

    /// Print a success message (color only if supported)
    pub fn success(&self, message: &str) {
        let output = self.colorize(message, |m| m.green().bold().to_string());
        println!("{}", output);
    }

    /// Print an error message (color only if supported)
    pub fn error(&self, message: &str) {
        let output = self.colorize(message, |m| m.red().bold().to_string());
        eprintln!("{}", output);
    }

    /// Print a warning message (color only if supported)
    pub fn warning(&self, message: &str) {
        let output = self.colorize(message, |m| m.yellow().bold().to_string());
        println!("{}", output);
    }

    pub fn info(&self, message: &str) {
        let output = self.colorize(message, |m| m.blue().bold().to_string());
        println!("{}", output);
    }

    /// Session state, colored by how usable the session is
    pub fn format_session_state(&self, authenticated: bool, expired: bool) -> String {
        let text = match (authenticated, expired) {
            (true, false) => "Authenticated",
            (true, true) => "Authenticated (access expired, will refresh)",
            (false, _) => "Not authenticated",
        };

        if !self.supports_color() {
            return text.to_string();
        }
        match (authenticated, expired) {
            (true, false) => text.green().to_string(),
            (true, true) => text.yellow().to_string(),
            (false, _) => text.red().to_string(),
        }
    }

    /// Format user field with fallback for missing data
    pub fn format_user_field(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| "-".to_string())
    }

    /// Create a card-style display for information
    pub fn card(&self, title: &str, content: Vec<(&str, String)>) {
        let term_width = self.width();
        let card_width = term_width.saturating_sub(4).clamp(50, 80);

        let supports_color = self.supports_color();

        println!("╭{}╮", "─".repeat(card_width - 2));
        let title_width = title.width();
        let title_spaces = card_width.saturating_sub(title_width + 4);
        if supports_color {
            println!("│ {} {}│", title.cyan().bold(), " ".repeat(title_spaces));
        } else {
            println!("│ {} {}│", title, " ".repeat(title_spaces));
        }
        println!("├{}┤", "─".repeat(card_width - 2));

        for (label, value) in content {
            // Strip ANSI codes for width calculations
            let label_plain = strip_ansi_codes(label);
            let value_plain = strip_ansi_codes(&value);

            let content_width = label_plain.width() + value_plain.width() + 4;
            let spaces = if content_width < card_width - 1 {
                card_width - content_width - 1
            } else {
                1
            };

            if supports_color {
                println!("│ {}: {}{}│", label.dimmed(), value, " ".repeat(spaces));
            } else {
                println!("│ {}: {}{}│", label, value, " ".repeat(spaces));
            }
        }

        println!("╰{}╯", "─".repeat(card_width - 2));
        println!();
    }

    pub fn favorites(&self, favorites: &[Favorite]) {
        if favorites.is_empty() {
            self.info("No favorite jobs yet.");
            return;
        }
        let rows = favorites
            .iter()
            .map(|f| {
                let company = f.job.company_name.as_deref().unwrap_or("-");
                (format!("#{}", f.job.id), format!("{} ({})", f.job.title, company))
            })
            .collect();
        self.list("Favorite jobs", rows);
    }

    pub fn notifications(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            self.info("No notifications.");
            return;
        }
        let rows = notifications
            .iter()
            .map(|n| {
                let marker = if n.is_read {
                    " ".to_string()
                } else {
                    self.colorize("•", |m| m.yellow().bold().to_string())
                };
                (format!("{} #{}", marker, n.id), n.message.clone())
            })
            .collect();
        self.list("Notifications", rows);
    }

    fn list(&self, title: &str, rows: Vec<(String, String)>) {
        let key_width = rows
            .iter()
            .map(|(k, _)| strip_ansi_codes(k).width())
            .max()
            .unwrap_or(0);

        if self.supports_color() {
            println!("{}", title.cyan().bold());
        } else {
            println!("{}", title);
        }
        for (key, value) in rows {
            let pad = key_width.saturating_sub(strip_ansi_codes(&key).width());
            println!("  {}{}  {}", key, " ".repeat(pad), value);
        }
    }

    /// Get terminal width for responsive layout
    pub fn width(&self) -> usize {
        self.term.size().1 as usize
    }

    /// Check if terminal supports color
    pub fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}
