//! Render objects, object selection and the camera

pub mod camera;
pub mod render_object;

pub use camera::{AxisPlane, CameraRig};
pub use render_object::RenderObject;

use crate::core::config::{DrawMode, SceneConfig};
use crate::input::{PendingInput, Selection};

/// Objects to draw plus the viewer's selection and camera
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<RenderObject>,
    selected: usize,
    /// Camera driven by input
    pub camera: CameraRig,
}

impl Scene {
    /// Scene with the first object selected
    pub fn new(objects: Vec<RenderObject>) -> Self {
        Self {
            objects,
            selected: 0,
            camera: CameraRig::default(),
        }
    }

    /// Build the object table from configuration
    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.objects.iter().map(RenderObject::from).collect())
    }

    /// Every object, in object-buffer order
    pub fn objects(&self) -> &[RenderObject] {
        &self.objects
    }

    /// Index of the selected object
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Selected object, if the scene has any
    pub fn selected(&self) -> Option<&RenderObject> {
        self.objects.get(self.selected)
    }

    /// Select an object by index; out-of-range requests are ignored
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.objects.len() {
            log::warn!("No render object {} (scene has {})", index + 1, self.objects.len());
            return false;
        }
        if index != self.selected {
            self.selected = index;
            log::info!("Selected render object {}: {}", index + 1, self.objects[index].name);
        }
        true
    }

    /// Move the selection forward, wrapping at the end
    pub fn select_next(&mut self) {
        if !self.objects.is_empty() {
            self.select((self.selected + 1) % self.objects.len());
        }
    }

    /// Apply one frame's drained input
    pub fn apply_input(&mut self, input: &PendingInput) {
        match input.selection {
            Some(Selection::Index(index)) => {
                self.select(index);
            }
            Some(Selection::Next) => self.select_next(),
            None => {}
        }
        if input.reset_camera {
            self.camera.reset();
        }
        if input.toggle_axis {
            self.camera.toggle_plane();
        }
        self.camera.apply(input.moves);
    }

    /// Objects recorded this frame, paired with their object-buffer index
    pub fn drawn_objects(&self, mode: DrawMode) -> Vec<(usize, &RenderObject)> {
        match mode {
            DrawMode::Selected => self.selected().map(|o| (self.selected, o)).into_iter().collect(),
            DrawMode::All => self.objects.iter().enumerate().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MoveFlags;

    fn scene() -> Scene {
        Scene::from_config(&SceneConfig::default())
    }

    #[test]
    fn test_from_default_config() {
        let scene = scene();
        assert_eq!(scene.objects().len(), SceneConfig::default().objects.len());
        assert_eq!(scene.selected_index(), 0);
    }

    #[test]
    fn test_select_out_of_range_ignored() {
        let mut scene = scene();
        assert!(scene.select(1));
        assert!(!scene.select(99));
        assert_eq!(scene.selected_index(), 1);
    }

    #[test]
    fn test_select_next_wraps() {
        let mut scene = scene();
        let count = scene.objects().len();
        for _ in 0..count {
            scene.select_next();
        }
        assert_eq!(scene.selected_index(), 0);
    }

    #[test]
    fn test_drawn_objects_by_mode() {
        let mut scene = scene();
        scene.select(2);
        let selected = scene.drawn_objects(DrawMode::Selected);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, 2);
        assert_eq!(scene.drawn_objects(DrawMode::All).len(), scene.objects().len());
    }

    #[test]
    fn test_empty_scene_draws_nothing() {
        let scene = Scene::new(Vec::new());
        assert!(scene.drawn_objects(DrawMode::Selected).is_empty());
    }

    #[test]
    fn test_apply_input_reset_and_move() {
        let mut scene = scene();
        scene.apply_input(&PendingInput {
            moves: MoveFlags::LEFT,
            ..Default::default()
        });
        assert!(scene.camera.offset().x > 0.0);

        scene.apply_input(&PendingInput {
            reset_camera: true,
            selection: Some(Selection::Index(1)),
            ..Default::default()
        });
        assert_eq!(scene.camera.offset().x, 0.0);
        assert_eq!(scene.selected_index(), 1);
    }
}
