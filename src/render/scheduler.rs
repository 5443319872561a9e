// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Render-on-demand scheduling.
//!
//! Mutations mark the scene dirty and schedule at most one frame. A frame
//! that paints clears the dirty flag and only schedules another frame when
//! a live video layer is showing or something invalidated the scene while
//! the frame was being drawn.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
}

#[derive(Debug, Clone)]
pub struct RenderScheduler {
    dirty: bool,
    scheduled: bool,
    frames_painted: u64,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        // The first frame always paints.
        Self {
            dirty: true,
            scheduled: true,
            frames_painted: 0,
        }
    }
}

impl RenderScheduler {
    pub fn state(&self) -> SchedulerState {
        if self.scheduled {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames_painted
    }

    /// Mark the scene dirty. Returns true when the caller must schedule a
    /// frame callback, i.e. none was pending yet.
    pub fn request_render(&mut self) -> bool {
        self.dirty = true;
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    /// Start a scheduled frame. Returns whether it should paint.
    ///
    /// The dirty flag is consumed here, so any invalidation raised while the
    /// frame is drawn is seen by [`RenderScheduler::end_frame`].
    pub fn begin_frame(&mut self, continuous: bool) -> bool {
        self.scheduled = false;
        if !self.dirty && !continuous {
            return false;
        }
        self.dirty = false;
        self.frames_painted += 1;
        true
    }

    /// Finish a frame. Returns true when another frame must be scheduled.
    pub fn end_frame(&mut self, continuous: bool) -> bool {
        if self.scheduled {
            return true;
        }
        if continuous || self.dirty {
            self.scheduled = true;
        }
        self.scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(scheduler: &mut RenderScheduler) {
        let painted = scheduler.begin_frame(false);
        assert!(painted);
        assert!(!scheduler.end_frame(false));
    }

    #[test]
    fn test_requests_coalesce_into_one_frame() {
        let mut scheduler = RenderScheduler::default();
        settle(&mut scheduler);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        assert!(scheduler.request_render());
        assert!(!scheduler.request_render());
        assert!(!scheduler.request_render());
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);

        assert!(scheduler.begin_frame(false));
        assert!(!scheduler.end_frame(false));
        assert_eq!(scheduler.frames_painted(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_clean_frame_skips_paint() {
        let mut scheduler = RenderScheduler::default();
        settle(&mut scheduler);
        assert!(!scheduler.begin_frame(false));
        assert_eq!(scheduler.frames_painted(), 1);
    }

    #[test]
    fn test_continuous_while_camera_active() {
        let mut scheduler = RenderScheduler::default();
        settle(&mut scheduler);

        scheduler.request_render();
        for _ in 0..5 {
            assert!(scheduler.begin_frame(true));
            assert!(scheduler.end_frame(true));
            assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        }

        // Camera stops: the already scheduled frame has nothing to paint.
        assert!(!scheduler.begin_frame(false));
        assert!(!scheduler.end_frame(false));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_invalidation_during_paint_reschedules() {
        let mut scheduler = RenderScheduler::default();
        settle(&mut scheduler);

        scheduler.request_render();
        assert!(scheduler.begin_frame(false));
        // Something mutates while the frame is being drawn.
        scheduler.request_render();
        assert!(scheduler.end_frame(false));
        assert!(scheduler.begin_frame(false));
        assert!(!scheduler.end_frame(false));
    }
}
