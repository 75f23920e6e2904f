mod accumulate;
mod member;

pub use accumulate::*;
pub use member::*;

use crate::par_slice;
use crate::partition::*;
use crate::util::*;
use bytemuck::Pod;

/// One `T` per local site, indexed by local index.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    values: Vec<T>,
}

impl<T: Pod + Send + Sync> Field<T> {
    /// Zero filled storage for `len` sites.
    pub fn zeroed(len: usize, node: NodeId) -> Self {
        let mut values = allocate_or_die(len, "field", node);
        values.resize(len, T::zeroed());
        Field { values }
    }

    pub fn new<const GRID_DIMENSION: usize, S>(
        partition: &Partition<GRID_DIMENSION, S>,
    ) -> Self {
        Self::zeroed(partition.sites_on_node(), partition.this_node())
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Field { values }
    }

    pub fn from_fn<const GRID_DIMENSION: usize, S: Sync, F>(
        partition: &Partition<GRID_DIMENSION, S>,
        f: F,
    ) -> Self
    where
        F: Fn(&Site<GRID_DIMENSION, S>) -> T + Sync,
    {
        let mut result = Self::new(partition);
        result.par_set_values(partition, f);
        result
    }

    /// Copy a site record member out into free storage.
    pub fn from_member<const GRID_DIMENSION: usize, S: Sync>(
        partition: &Partition<GRID_DIMENSION, S>,
        member: &Member<S, T>,
    ) -> Self {
        Self::from_fn(partition, |site| *member.get(&site.data))
    }

    pub fn par_set_values<const GRID_DIMENSION: usize, S: Sync, F>(
        &mut self,
        partition: &Partition<GRID_DIMENSION, S>,
        f: F,
    ) where
        F: Fn(&Site<GRID_DIMENSION, S>) -> T + Sync,
    {
        assert_eq!(self.values.len(), partition.sites_on_node());
        let sites = partition.sites();
        par_slice::set_from_index(
            &mut self.values,
            partition.chunk_size(),
            |i| f(&sites[i]),
        );
    }

    pub fn fill(&mut self, value: T, chunk_size: usize) {
        par_slice::set_value(&mut self.values, value, chunk_size);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }
}

impl<T> std::ops::Index<usize> for Field<T> {
    type Output = T;

    fn index(&self, local_index: usize) -> &T {
        &self.values[local_index]
    }
}

impl<T> std::ops::IndexMut<usize> for Field<T> {
    fn index_mut(&mut self, local_index: usize) -> &mut T {
        &mut self.values[local_index]
    }
}

/// Anything a gather can read one value per site from.
pub trait GatherSource<const GRID_DIMENSION: usize, S, T> {
    fn name(&self) -> &str;

    /// Number of values available, must equal the node's site count.
    fn source_len(&self, partition: &Partition<GRID_DIMENSION, S>) -> usize;

    fn fetch(&self, partition: &Partition<GRID_DIMENSION, S>, local_index: usize) -> T;
}

impl<const GRID_DIMENSION: usize, S, T, G> GatherSource<GRID_DIMENSION, S, T> for &G
where
    G: GatherSource<GRID_DIMENSION, S, T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn source_len(&self, partition: &Partition<GRID_DIMENSION, S>) -> usize {
        (**self).source_len(partition)
    }

    #[inline]
    fn fetch(&self, partition: &Partition<GRID_DIMENSION, S>, local_index: usize) -> T {
        (**self).fetch(partition, local_index)
    }
}

impl<const GRID_DIMENSION: usize, S, T: Pod> GatherSource<GRID_DIMENSION, S, T>
    for Field<T>
{
    fn name(&self) -> &str {
        "field"
    }

    fn source_len(&self, _partition: &Partition<GRID_DIMENSION, S>) -> usize {
        self.values.len()
    }

    #[inline]
    fn fetch(&self, _partition: &Partition<GRID_DIMENSION, S>, local_index: usize) -> T {
        self.values[local_index]
    }
}

impl<const GRID_DIMENSION: usize, S, T: Pod> GatherSource<GRID_DIMENSION, S, T>
    for Member<S, T>
{
    fn name(&self) -> &str {
        Member::name(self)
    }

    fn source_len(&self, partition: &Partition<GRID_DIMENSION, S>) -> usize {
        partition.sites_on_node()
    }

    #[inline]
    fn fetch(&self, partition: &Partition<GRID_DIMENSION, S>, local_index: usize) -> T {
        *self.get(&partition.site(local_index).data)
    }
}
