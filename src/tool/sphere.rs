use glam::IVec3;

use crate::tool::Tool;

/// Round brush touching every offset strictly closer than `radius`.
#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl Tool for Sphere {
    #[inline(always)]
    fn reach(&self) -> i32 {
        self.radius.ceil().max(0.0) as i32
    }

    #[inline(always)]
    fn contains_offset(&self, offset: IVec3) -> bool {
        (offset.as_vec3().length_squared()) < self.radius * self.radius
    }
}

#[test]
fn sphere_offsets() {
    let tool = Sphere::new(2.0);
    assert_eq!(tool.reach(), 2);
    assert!(tool.contains_offset(IVec3::ZERO));
    assert!(tool.contains_offset(IVec3::ONE));
    assert!(!tool.contains_offset(IVec3::new(2, 0, 0)));

    let tool = Sphere::new(2.5);
    assert_eq!(tool.reach(), 3);
    assert!(tool.contains_offset(IVec3::new(2, 0, 0)));
    assert!(tool.contains_offset(IVec3::new(2, 1, 1)));
    assert!(!tool.contains_offset(IVec3::new(2, 2, 0)));
}
