//! Token projection.
//!
//! Patterns never see the raw message. They run over a *projection*: the
//! message text with every recognized entity span replaced by a marker that
//! encodes the entity's type label, literal text around the spans kept as is.
//!
//! ```text
//! text:     "a red shirt with stripes"
//! entities:    color[2,5] product[6,11] pattern[17,24]
//! projected: "a ⟪color⟫ ⟪product⟫ with ⟪pattern⟫"
//! markers:     └─ entity 0  └─ entity 1    └─ entity 2
//! ```
//!
//! ## Ordering and overlaps
//!
//! Entities are projected in ascending `start` order, ties broken by `end` and
//! then by input position (the sort is stable, since some recognizers do not
//! emit their spans in order). An entity that starts before the previous
//! projected entity ends is *skipped*: it takes no part in matching and is
//! passed through unconsumed. The same happens to an entity whose span is empty
//! or lies outside the text.
//!
//! Entity offsets are character offsets; the projection converts them to byte
//! offsets before slicing.

use crate::api::BasicEntity;
use crate::{EntityId, MARKER_CLOSE, MARKER_OPEN, Marker, Range};

#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// Projected text.
    pub text: String,
    /// One marker per projected entity, ordered by position.
    pub(crate) markers: Vec<Marker>,
    /// Entities left out of the projection, in input order.
    pub(crate) skipped: Vec<EntityId>,
    /// Every entity id in processing order (`start`, `end`, input position).
    pub(crate) order: Vec<EntityId>,
}

impl Projection {
    /// Project `entities` onto `text`.
    pub fn build(text: &str, entities: &[BasicEntity]) -> Self {
        let order = processing_order(entities);

        // Byte offset of every character boundary, including the end of text.
        let boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();

        let mut projected = String::with_capacity(text.len() + entities.len() * 8);
        let mut markers = Vec::with_capacity(entities.len());
        let mut skipped = Vec::new();
        let mut cursor = 0usize;
        let mut previous_end: Option<usize> = None;

        for &id in &order {
            let entity = &entities[id];
            let span = if entity.start < entity.end {
                boundaries.get(entity.start).zip(boundaries.get(entity.end))
            } else {
                None
            };

            let Some((&start_byte, &end_byte)) = span else {
                tracing::trace!(entity = id, start = entity.start, end = entity.end, "skipping entity with invalid span");
                skipped.push(id);
                continue;
            };

            if previous_end.is_some_and(|end| entity.start < end) {
                tracing::trace!(entity = id, start = entity.start, end = entity.end, "skipping overlapping entity");
                skipped.push(id);
                continue;
            }

            push_literal(&mut projected, &text[cursor..start_byte]);

            let marker_start = projected.len();
            projected.push(MARKER_OPEN);
            projected.extend(entity.label.chars().filter(|&c| c != MARKER_OPEN && c != MARKER_CLOSE));
            projected.push(MARKER_CLOSE);
            markers.push(Marker { entity: id, range: Range { start: marker_start, end: projected.len() } });

            cursor = end_byte;
            previous_end = Some(entity.end);
        }

        push_literal(&mut projected, &text[cursor..]);
        skipped.sort_unstable();

        Projection { text: projected, markers, skipped, order }
    }

    /// Find the marker occupying exactly `start..end` of the projected text.
    pub(crate) fn marker_at(&self, start: usize, end: usize) -> Option<&Marker> {
        let idx = self.markers.binary_search_by_key(&start, |m| m.range.start).ok()?;
        let marker = &self.markers[idx];
        (marker.range.end == end).then_some(marker)
    }

    /// Projected text with markers rendered as `@label`, for reports.
    pub fn readable(&self) -> String {
        self.text.chars().filter(|&c| c != MARKER_CLOSE).map(|c| if c == MARKER_OPEN { '@' } else { c }).collect()
    }
}

/// Entity ids sorted by `(start, end)`, stable on input position.
pub(crate) fn processing_order(entities: &[BasicEntity]) -> Vec<EntityId> {
    let mut order: Vec<EntityId> = (0..entities.len()).collect();
    order.sort_by_key(|&id| (entities[id].start, entities[id].end));
    order
}

/// Copy literal message text, neutralizing any marker delimiter it contains.
fn push_literal(out: &mut String, literal: &str) {
    for c in literal.chars() {
        out.push(if c == MARKER_OPEN || c == MARKER_CLOSE { char::REPLACEMENT_CHARACTER } else { c });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(label: &str, start: usize, end: usize) -> BasicEntity {
        BasicEntity::new(label, "", start, end)
    }

    #[test]
    fn replaces_spans_and_keeps_literal_text() {
        let text = "a red shirt with stripes";
        let entities = vec![entity("color", 2, 5), entity("product", 6, 11), entity("pattern", 17, 24)];
        let p = Projection::build(text, &entities);

        assert_eq!(p.readable(), "a @color @product with @pattern");
        assert_eq!(p.markers.len(), 3);
        assert!(p.skipped.is_empty());

        let m = &p.markers[1];
        assert_eq!(&p.text[m.range.start..m.range.end], format!("{MARKER_OPEN}product{MARKER_CLOSE}"));
    }

    #[test]
    fn projects_in_position_order_regardless_of_input_order() {
        let text = "red shirt";
        let entities = vec![entity("product", 4, 9), entity("color", 0, 3)];
        let p = Projection::build(text, &entities);

        assert_eq!(p.readable(), "@color @product");
        assert_eq!(p.markers[0].entity, 1);
        assert_eq!(p.order, vec![1, 0]);
    }

    #[test]
    fn overlapping_entities_are_skipped() {
        let text = "new york city";
        let entities = vec![entity("city", 0, 13), entity("state", 0, 8), entity("city", 0, 8)];
        let p = Projection::build(text, &entities);

        // (0, 8) sorts before (0, 13); the first of the two (0, 8) spans wins.
        assert_eq!(p.readable(), "@state city");
        assert_eq!(p.skipped, vec![0, 2]);
    }

    #[test]
    fn invalid_spans_are_skipped() {
        let text = "short";
        let entities = vec![entity("a", 3, 3), entity("b", 2, 99), entity("c", 0, 5)];
        let p = Projection::build(text, &entities);

        assert_eq!(p.readable(), "@c");
        assert_eq!(p.skipped, vec![0, 1]);
    }

    #[test]
    fn character_offsets_are_converted_to_bytes() {
        let text = "una camisa roja bonita";
        let accented = "é camisa roja";
        let p = Projection::build(accented, &[entity("product", 2, 8), entity("color", 9, 13)]);
        assert_eq!(p.readable(), "é @product @color");

        let plain = Projection::build(text, &[entity("product", 4, 10)]);
        assert_eq!(plain.readable(), "una @product roja bonita");
    }

    #[test]
    fn marker_delimiters_in_message_text_are_neutralized() {
        let text = format!("x{MARKER_OPEN}color{MARKER_CLOSE} shirt");
        let p = Projection::build(&text, &[entity("product", 9, 14)]);

        assert!(p.text.starts_with('x'));
        assert_eq!(p.markers.len(), 1);
        assert_eq!(p.text.matches(MARKER_OPEN).count(), 1);
    }

    #[test]
    fn marker_lookup_requires_exact_alignment() {
        let p = Projection::build("red shirt", &[entity("color", 0, 3), entity("product", 4, 9)]);
        let m = p.markers[1].range;

        assert_eq!(p.marker_at(m.start, m.end).map(|m| m.entity), Some(1));
        assert!(p.marker_at(m.start, m.end - 1).is_none());
        assert!(p.marker_at(m.start + 1, m.end).is_none());
    }

    #[test]
    fn empty_entity_list_projects_text_unchanged() {
        let p = Projection::build("nothing here", &[]);
        assert_eq!(p.text, "nothing here");
        assert!(p.markers.is_empty());
    }
}
