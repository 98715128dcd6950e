use super::object::ObjectId;
use super::World;

/// Outcome of a swept box query along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// Largest X movement that keeps the boxes apart (zero when dx was zero).
    pub resolve_x: i32,
    /// Largest Y movement that keeps the boxes apart (zero when dy was zero).
    pub resolve_y: i32,
    /// The body that was hit.
    pub other: ObjectId,
}

impl World {
    /// Sweeps `id`'s box by `(dx, dy)` against every other collidable body.
    ///
    /// Returns the first contact in insertion order. Both bodies receive a
    /// `handle_collision` call; the mover misses it when the query is issued
    /// from inside its own hook, since its behaviour is detached then.
    /// Callers test one axis at a time.
    pub fn check_for_collision(&mut self, id: ObjectId, dx: i32, dy: i32) -> Option<Collision> {
        let mover = self.get(id)?;
        if !mover.is_collidable {
            return None;
        }
        let start = mover.aabb();
        let swept = start.translated(dx, dy);

        let hit = self.objects.iter().enumerate().find_map(|(index, other)| {
            if index == id.index() || !other.is_collidable {
                return None;
            }
            let body = other.aabb();
            if !swept.intersects(&body) {
                return None;
            }
            let resolve_x = match dx {
                0 => 0,
                d if d > 0 => body.x - start.right(),
                _ => body.right() - start.x,
            };
            let resolve_y = match dy {
                0 => 0,
                d if d > 0 => body.y - start.bottom(),
                _ => body.bottom() - start.y,
            };
            Some(Collision {
                resolve_x,
                resolve_y,
                other: ObjectId(index as u32),
            })
        })?;

        self.notify_collision(id, &hit, hit.other);
        self.notify_collision(hit.other, &hit, id);
        Some(hit)
    }

    fn notify_collision(&mut self, id: ObjectId, hit: &Collision, other: ObjectId) {
        let index = id.index();
        if let (Some(Some(behavior)), Some(object)) =
            (self.behaviors.get_mut(index), self.objects.get_mut(index))
        {
            behavior.handle_collision(object, hit, other);
        }
    }
}
