/// A drag gesture in progress. Positions are screen coordinates of the
/// panel's top-centre anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub origin_pointer: (f32, f32),
    pub panel_origin_position: (f32, f32),
    pub active: bool,
    offset: (f32, f32),
}

impl DragSession {
    pub fn begin(origin_pointer: (f32, f32), panel_origin_position: (f32, f32)) -> Self {
        Self {
            origin_pointer,
            panel_origin_position,
            active: true,
            offset: (0.0, 0.0),
        }
    }

    /// Accumulate a pointer delta and return the new panel position.
    pub fn apply_delta(&mut self, dx: f32, dy: f32) -> (f32, f32) {
        self.offset.0 += dx;
        self.offset.1 += dy;
        self.position()
    }

    pub fn position(&self) -> (f32, f32) {
        (
            self.panel_origin_position.0 + self.offset.0,
            self.panel_origin_position.1 + self.offset.1,
        )
    }

    /// Current pointer position implied by the deltas seen so far.
    pub fn pointer(&self) -> (f32, f32) {
        (
            self.origin_pointer.0 + self.offset.0,
            self.origin_pointer.1 + self.offset.1,
        )
    }

    pub fn end(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate_from_panel_origin() {
        let mut drag = DragSession::begin((500.0, 20.0), (480.0, 12.0));
        drag.apply_delta(10.0, 5.0);
        assert_eq!(drag.apply_delta(-4.0, 1.0), (486.0, 18.0));
        assert_eq!(drag.pointer(), (506.0, 26.0));
    }
}
