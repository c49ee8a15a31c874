use std::collections::BTreeSet;

/// The roles to add to and remove from a member after a menu submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta<T: Ord> {
    /// The roles to give the member.
    pub add: BTreeSet<T>,
    /// The roles to take from the member.
    pub remove: BTreeSet<T>,
}

impl<T: Ord> Delta<T> {
    /// Returns whether the delta changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Computes the roles to add and remove given the roles a member holds, the roles offered by the
/// menu, and the roles the member selected.
///
/// Roles that were not offered are never touched, and selections outside of the offered roles are
/// ignored.
pub fn reconcile<T>(current: &BTreeSet<T>, offered: &BTreeSet<T>, selected: &BTreeSet<T>) -> Delta<T>
where
    T: Copy + Ord,
{
    let remove = current.intersection(offered).filter(|r| !selected.contains(r)).copied().collect();
    let add = selected.intersection(offered).filter(|r| !current.contains(r)).copied().collect();

    Delta { add, remove }
}
