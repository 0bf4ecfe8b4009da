/// Frame slot bookkeeping shared by swapchain implementations
///
/// A frame slot owns one image-available semaphore, one render-finished
/// semaphore and one in-flight fence. Slots rotate modulo the slot count,
/// never modulo the image count, and each image remembers the slot whose
/// fence last covered it so a reacquired image can be waited on.

/// Tracks the current frame slot and per-image slot ownership
#[derive(Debug, Clone)]
pub struct FrameSlotTracker {
    slot_count: usize,
    current: usize,
    image_owner: Vec<Option<usize>>,
}

impl FrameSlotTracker {
    /// Create a tracker for `slot_count` slots and `image_count` images
    pub fn new(slot_count: usize, image_count: usize) -> Self {
        assert!(slot_count > 0, "at least one frame slot is required");
        Self {
            slot_count,
            current: 0,
            image_owner: vec![None; image_count],
        }
    }

    /// Slot the frame being recorded belongs to
    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn image_count(&self) -> usize {
        self.image_owner.len()
    }

    /// Slot that last claimed `image_index`
    pub fn owner(&self, image_index: usize) -> Option<usize> {
        self.image_owner.get(image_index).copied().flatten()
    }

    /// Record the current slot as the owner of an acquired image.
    ///
    /// Returns the previous owner when it is a different slot: the caller
    /// must wait on that slot's fence before rendering into the image.
    pub fn claim_image(&mut self, image_index: usize) -> Option<usize> {
        assert!(
            image_index < self.image_owner.len(),
            "image index {} out of range ({} images)",
            image_index,
            self.image_owner.len()
        );
        let previous = self.image_owner[image_index].replace(self.current);
        previous.filter(|&slot| slot != self.current)
    }

    /// Move to the next slot; returns the new slot
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.slot_count;
        self.current
    }

    /// Forget image ownership (after swapchain recreation)
    pub fn reset_images(&mut self, image_count: usize) {
        self.image_owner = vec![None; image_count];
    }
}

#[cfg(test)]
#[path = "frame_slots_tests.rs"]
mod tests;
