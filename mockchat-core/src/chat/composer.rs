//! Draft text and pending attachments

use super::model::Attachment;

/// What the user is about to send
#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    attachments: Vec<Attachment>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Remove the attachment at `index`; out-of-range does nothing
    pub fn detach(&mut self, index: usize) -> Option<Attachment> {
        if index < self.attachments.len() {
            Some(self.attachments.remove(index))
        } else {
            None
        }
    }

    /// Non-blank text or at least one attachment
    pub fn is_sendable(&self) -> bool {
        !self.text.trim().is_empty() || !self.attachments.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.attachments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sendable_rules() {
        let mut composer = Composer::new();
        assert!(!composer.is_sendable());

        composer.set_text(" \n\t");
        assert!(!composer.is_sendable());

        composer.attach(Attachment::new("a.pdf", "application/pdf"));
        assert!(composer.is_sendable());
    }

    #[test]
    fn test_detach_by_index() {
        let mut composer = Composer::new();
        composer.attach(Attachment::new("a.txt", "text/plain"));
        composer.attach(Attachment::new("b.txt", "text/plain"));

        assert_eq!(composer.detach(5), None);
        assert_eq!(composer.detach(0).unwrap().name, "a.txt");
        assert_eq!(composer.attachments().len(), 1);
        assert_eq!(composer.attachments()[0].name, "b.txt");
    }
}
