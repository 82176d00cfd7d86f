use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Rating on the 0-100 scale, or a dash when unrated
pub fn format_rating(rating: Option<f64>) -> String {
  match rating {
    Some(r) => format!("{:>3.0}", r),
    None => "  -".to_string(),
  }
}

pub fn rating_color(rating: Option<f64>) -> Color {
  match rating {
    Some(r) if r >= 80.0 => Color::Green,
    Some(r) if r >= 60.0 => Color::Yellow,
    Some(_) => Color::Red,
    None => Color::DarkGray,
  }
}

/// "2h 05m" style play time
pub fn format_duration(minutes: u32) -> String {
  if minutes < 60 {
    format!("{}m", minutes)
  } else {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
  }
}

pub fn format_date(at: &DateTime<Utc>) -> String {
  at.format("%Y-%m-%d %H:%M").to_string()
}
