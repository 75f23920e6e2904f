use rayon::prelude::*;

/// Sets each element to the same value.
/// `chunk_size` is break the work into tasks for multi-threading.
pub fn set_value<T: Copy + Send + Sync>(
    a_slice: &mut [T],
    value: T,
    chunk_size: usize,
) {
    a_slice
        .par_chunks_mut(chunk_size)
        .for_each(|a_chunk: &mut [T]| {
            for a in a_chunk {
                *a = value;
            }
        });
}

/// Visit every element with its index, chunked for multi-threading.
pub fn for_each_indexed<T, F>(a_slice: &mut [T], chunk_size: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    a_slice
        .par_chunks_mut(chunk_size)
        .enumerate()
        .for_each(|(chunk_index, a_chunk): (usize, &mut [T])| {
            let offset = chunk_index * chunk_size;
            for (i, a) in a_chunk.iter_mut().enumerate() {
                f(offset + i, a);
            }
        });
}

/// Sets element `i` to `f(i)`.
pub fn set_from_index<T, F>(a_slice: &mut [T], chunk_size: usize, f: F)
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    for_each_indexed(a_slice, chunk_size, |i, a| *a = f(i));
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn set_values_test() {
        {
            let mut a = vec![0, 1, 2, 3, 4, 5];
            set_value(&mut a, 7, 6);
            for v in a {
                assert_eq!(v, 7);
            }
        }

        {
            let n = 1000;
            let chunk_size = 10;
            let value = n + 1;
            let mut a = Vec::with_capacity(n);
            for i in 0..n {
                a.push(i);
            }

            set_value(&mut a, value, chunk_size);

            for v in a {
                assert_eq!(v, value);
            }
        }
    }

    #[test]
    fn set_from_index_test() {
        for chunk_size in [1, 7, 100, 1000] {
            let mut a = vec![0usize; 333];
            set_from_index(&mut a, chunk_size, |i| 3 * i);
            for (i, v) in a.iter().enumerate() {
                assert_eq!(*v, 3 * i);
            }
        }
    }

    #[test]
    fn for_each_indexed_test() {
        let mut a = vec![1.0f64; 50];
        for_each_indexed(&mut a, 8, |i, v| *v += i as f64);
        assert_eq!(a[0], 1.0);
        assert_eq!(a[49], 50.0);
    }
}
