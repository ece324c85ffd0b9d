//! Benchmark utilities.

use natrix_core::{Handle, Session};
use natrix_ffi::{nx_store_open, nx_store_put, Natrix, NxOid, NxStore, NX_KIND_BLOB};
use natrix_testkit::init_tracing;
use rand::Rng;

/// Generate random object data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// A store kept alive for the duration of a benchmark.
pub struct BenchStore {
    /// The store handle.
    pub store: Handle<NxStore>,
    /// Ids of the stored objects, in id order.
    pub ids: Vec<NxOid>,
    _session: Session<Natrix>,
}

impl BenchStore {
    /// Opens a store holding `count` random blobs of `payload_size` bytes.
    pub fn populated(count: usize, payload_size: usize) -> Self {
        init_tracing();
        let session = Session::<Natrix>::acquire().expect("Failed to initialize natrix");
        let mut store: Handle<NxStore> = session
            .alloc(|out| unsafe { nx_store_open(out, c"bench".as_ptr()) })
            .expect("Failed to open store");

        let mut ids: Vec<NxOid> = (0..count)
            .map(|_| {
                let data = random_data(payload_size);
                store
                    .call_fixed_mut(|out, s| unsafe {
                        nx_store_put(out, s, NX_KIND_BLOB, data.as_ptr(), data.len())
                    })
                    .expect("Failed to put object")
            })
            .collect();
        ids.sort();
        ids.dedup();

        Self {
            store,
            ids,
            _session: session,
        }
    }
}
