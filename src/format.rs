/// `m:ss`, as shown next to the progress bar.
pub fn format_time(secs: f64) -> String {
    let t = if secs.is_finite() && secs > 0.0 { secs as u64 } else { 0 };
    format!("{}:{:02}", t / 60, t % 60)
}

/// Genre tags are stored lowercase; the player shows them capitalized.
pub fn genre_label(genre: &str) -> String {
    let mut chars = genre.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Step forward through `len` slots, wrapping from the last to the first.
pub fn wrap_next(current: usize, len: usize) -> usize {
    if len == 0 || current + 1 >= len {
        0
    } else {
        current + 1
    }
}

/// Step backward through `len` slots, wrapping from the first to the last.
pub fn wrap_prev(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current == 0 || current >= len {
        len - 1
    } else {
        current - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.9), "0:59");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(3725.0), "62:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_genre_label() {
        assert_eq!(genre_label("techno"), "Techno");
        assert_eq!(genre_label("deep house"), "Deep house");
        assert_eq!(genre_label("ıstanbul"), "Istanbul");
        assert_eq!(genre_label(""), "");
    }

    #[test]
    fn test_wrap_next() {
        assert_eq!(wrap_next(0, 3), 1);
        assert_eq!(wrap_next(1, 3), 2);
        assert_eq!(wrap_next(2, 3), 0);
        assert_eq!(wrap_next(0, 1), 0);
        assert_eq!(wrap_next(0, 0), 0);
    }

    #[test]
    fn test_wrap_prev() {
        assert_eq!(wrap_prev(2, 3), 1);
        assert_eq!(wrap_prev(0, 3), 2);
        assert_eq!(wrap_prev(0, 1), 0);
        assert_eq!(wrap_prev(0, 0), 0);
    }
}
