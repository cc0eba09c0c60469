use super::{Task, TaskContext};
use crate::domain::PseudoTransaction;

/// Trims tags, drops empty ones and removes duplicates keeping the first
pub struct TagsTask;

impl Task for TagsTask {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn process(&self, mut line: PseudoTransaction, _ctx: &TaskContext<'_>) -> PseudoTransaction {
        for split in &mut line.transactions {
            let mut tags: Vec<String> = Vec::with_capacity(split.tags.len());
            for tag in split.tags.drain(..) {
                let tag = tag.trim();
                if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                    tags.push(tag.to_string());
                }
            }
            split.tags = tags;
        }
        line
    }
}
