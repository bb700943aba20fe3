use crate::game::object::{GameObject, ObjectId};
use crate::geom::{Point, Rect};

/// Ordered drawing group. Structural changes are queued and only take
/// effect on `flush`, so the object list never changes mid-iteration.
#[derive(Debug, Default)]
pub struct Layer {
    objects: Vec<(ObjectId, GameObject)>,
    pending_add: Vec<(ObjectId, GameObject)>,
    pending_remove: Vec<ObjectId>,
    pending_clear: bool,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: ObjectId, object: GameObject) {
        tracing::trace!(?id, "queueing object");
        self.pending_add.push((id, object));
    }

    pub fn remove(&mut self, id: ObjectId) {
        self.pending_remove.push(id);
    }

    pub fn clear(&mut self) {
        self.pending_clear = true;
        self.pending_add.clear();
        self.pending_remove.clear();
    }

    pub fn flush(&mut self) {
        if std::mem::take(&mut self.pending_clear) {
            self.objects.clear();
        }
        if !self.pending_remove.is_empty() {
            let removed = std::mem::take(&mut self.pending_remove);
            self.objects.retain(|(id, _)| !removed.contains(id));
            self.pending_add.retain(|(id, _)| !removed.contains(id));
        }
        self.objects.append(&mut self.pending_add);
    }

    /// Steps animations, kills objects that left `active_area`, and drops
    /// the dead. Returns how many objects were dropped.
    pub fn update(&mut self, now_ms: u64, active_area: Option<Rect>) -> usize {
        for (_, object) in &mut self.objects {
            object.step_anims(now_ms);
            if let Some(area) = active_area {
                if !area.intersects(&object.bounds()) {
                    object.kill();
                }
            }
        }
        let before = self.objects.len();
        self.objects.retain(|(_, object)| !object.is_dead());
        before - self.objects.len()
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects
            .iter()
            .chain(self.pending_add.iter())
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, object)| object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects
            .iter_mut()
            .chain(self.pending_add.iter_mut())
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, object)| object)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &GameObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Top-most visible object under `point`.
    pub fn object_at(&self, point: Point) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|(_, object)| object.visible && !object.is_dead() && object.contains(point))
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::game::anim::SimpleMove;
    use crate::geom::Shape;

    fn square(x: f64, y: f64) -> GameObject {
        GameObject::shape(Color::BLUE, Shape::rectangle(10.0, 10.0), x, y)
    }

    #[test]
    fn adds_are_invisible_until_flush() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), square(0.0, 0.0));
        assert!(layer.is_empty());
        assert!(layer.get(ObjectId(1)).is_some());
        layer.flush();
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn remove_applies_to_queued_objects_too() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), square(0.0, 0.0));
        layer.flush();
        layer.add(ObjectId(2), square(0.0, 0.0));
        layer.remove(ObjectId(1));
        layer.remove(ObjectId(2));
        layer.flush();
        assert!(layer.is_empty());
    }

    #[test]
    fn dead_objects_are_dropped_on_update() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), square(0.0, 0.0));
        layer.add(ObjectId(2), square(0.0, 0.0));
        layer.flush();
        layer.get_mut(ObjectId(1)).unwrap().kill();
        assert_eq!(layer.update(0, None), 1);
        assert!(layer.get(ObjectId(1)).is_none());
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn leaving_the_active_area_kills() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), square(0.0, 0.0).with_anim(SimpleMove::new(100.0, 0.0)));
        layer.flush();
        let area = Some(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(layer.update(0, area), 0);
        assert_eq!(layer.update(300, area), 0);
        assert_eq!(layer.update(600, area), 1);
    }

    #[test]
    fn clear_drops_everything_on_flush() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), square(0.0, 0.0));
        layer.flush();
        layer.add(ObjectId(2), square(0.0, 0.0));
        layer.clear();
        layer.flush();
        assert!(layer.is_empty());
    }

    #[test]
    fn hit_test_prefers_top_most() {
        let mut layer = Layer::new();
        layer.add(ObjectId(1), square(0.0, 0.0));
        layer.add(ObjectId(2), square(5.0, 5.0));
        layer.flush();
        assert_eq!(layer.object_at(Point::new(7.0, 7.0)), Some(ObjectId(2)));
        assert_eq!(layer.object_at(Point::new(2.0, 2.0)), Some(ObjectId(1)));
        assert_eq!(layer.object_at(Point::new(40.0, 40.0)), None);
    }
}
