//! ## tty
//!
//! terminal detection for raw descriptors

/// Returns whether `fd` refers to a terminal
#[cfg(target_family = "unix")]
pub fn is_terminal(fd: i32) -> bool {
    // SAFETY: isatty only inspects the descriptor; an invalid one yields 0
    unsafe { libc::isatty(fd) == 1 }
}

/// Descriptors are never exposed on this platform
#[cfg(not(target_family = "unix"))]
pub fn is_terminal(_fd: i32) -> bool {
    false
}

#[cfg(test)]
mod test {

    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn should_not_be_terminal() {
        assert_eq!(is_terminal(-1), false);
    }

    #[test]
    #[cfg(target_family = "unix")]
    fn should_not_be_terminal_for_regular_file() {
        use std::os::unix::io::AsRawFd;

        let file = tempfile::tempfile().unwrap();
        assert_eq!(is_terminal(file.as_raw_fd()), false);
    }
}
