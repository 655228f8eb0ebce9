//! Stack-based construction of the section tree.

use crate::model::DocumentSection;

/// Turns a flat, document-ordered section list into a tree.
///
/// For each section, stack entries with a level greater than or equal to
/// the current level are closed; the section then becomes a child of the
/// remaining top entry, or a root when the stack is empty. Equal levels are
/// therefore always siblings.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyBuilder;

impl HierarchyBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self
    }

    /// Build the tree and return root-level sections in document order.
    pub fn build(&self, flat: Vec<DocumentSection>) -> Vec<DocumentSection> {
        let mut roots: Vec<DocumentSection> = Vec::new();
        let mut stack: Vec<DocumentSection> = Vec::new();

        for section in flat {
            while stack.last().is_some_and(|top| top.level >= section.level) {
                if let Some(closed) = stack.pop() {
                    attach(&mut stack, &mut roots, closed);
                }
            }
            stack.push(section);
        }

        while let Some(closed) = stack.pop() {
            attach(&mut stack, &mut roots, closed);
        }

        roots
    }
}

/// Attach a finished section to the new stack top, or to the roots.
fn attach(
    stack: &mut [DocumentSection],
    roots: &mut Vec<DocumentSection>,
    section: DocumentSection,
) {
    match stack.last_mut() {
        Some(parent) => parent.add_subsection(section),
        None => roots.push(section),
    }
}
