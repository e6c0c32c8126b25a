/// Action represents edits to perform on a value grid with a given
/// Tool.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action
{
    /// Add material to the volume
    Add,
    /// Subtract material from the volume
    Remove,
}

impl Action
{
    /// Signed change this action applies for a given strength.
    #[inline(always)]
    pub fn delta(&self, strength: f32) -> f32
    {
        match self {
            Action::Add => strength,
            Action::Remove => -strength,
        }
    }
}

#[test]
fn add_then_remove_cancels() {
    let mut value = 0.25;
    value += Action::Add.delta(0.5);
    assert_eq!(value, 0.75);
    value += Action::Remove.delta(0.5);
    assert_eq!(value, 0.25);
}
