/// Names a value embedded in every site record.
/// The accessor plays the part of a byte offset into the record.
pub struct Member<S, T> {
    name: &'static str,
    get: fn(&S) -> &T,
}

impl<S, T> Member<S, T> {
    pub const fn new(name: &'static str, get: fn(&S) -> &T) -> Self {
        Member { name, get }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn get<'a>(&self, record: &'a S) -> &'a T {
        (self.get)(record)
    }
}

impl<S, T> Clone for Member<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for Member<S, T> {}

impl<S, T> std::fmt::Debug for Member<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Member({})", self.name)
    }
}
