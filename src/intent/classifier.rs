//! Service classification strategy
//!
//! Deliberately simple: fixed keyword lists checked in priority order,
//! calendar first, then files, mail as the fallback. Kept behind a one
//! method trait so a smarter classifier can be swapped in without
//! touching the router.

use crate::services::Service;

pub trait ServiceClassifier: Send + Sync {
    fn classify(&self, command: &str) -> Service;
}

const CALENDAR_KEYWORDS: &[&str] = &[
    "meeting",
    "event",
    "schedule",
    "calendar",
    "appointment",
    "remind",
    "tomorrow",
    "next week",
    "today at",
];

const DRIVE_KEYWORDS: &[&str] = &[
    "file",
    "folder",
    "document",
    "drive",
    "upload",
    "download",
    "share",
    "pdf",
    "doc",
    "spreadsheet",
];

/// Default keyword-scoring classifier
#[derive(Default)]
pub struct KeywordClassifier;

impl ServiceClassifier for KeywordClassifier {
    fn classify(&self, command: &str) -> Service {
        let command_lower = command.to_lowercase();

        if CALENDAR_KEYWORDS.iter().any(|k| command_lower.contains(k)) {
            return Service::Calendar;
        }
        if DRIVE_KEYWORDS.iter().any(|k| command_lower.contains(k)) {
            return Service::Drive;
        }
        Service::Mail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_keywords_win() {
        let classifier = KeywordClassifier;
        assert_eq!(classifier.classify("schedule a meeting"), Service::Calendar);
        assert_eq!(classifier.classify("What's on my Calendar?"), Service::Calendar);
    }

    #[test]
    fn test_calendar_takes_priority_over_drive() {
        // "share the meeting notes" hits both keyword sets; calendar is
        // checked first.
        let classifier = KeywordClassifier;
        assert_eq!(
            classifier.classify("share the meeting notes"),
            Service::Calendar
        );
    }

    #[test]
    fn test_drive_keywords() {
        let classifier = KeywordClassifier;
        assert_eq!(classifier.classify("upload the report"), Service::Drive);
        assert_eq!(classifier.classify("find that pdf"), Service::Drive);
    }

    #[test]
    fn test_mail_is_default() {
        let classifier = KeywordClassifier;
        assert_eq!(classifier.classify("reply to alice"), Service::Mail);
        assert_eq!(classifier.classify("anything else"), Service::Mail);
    }
}
