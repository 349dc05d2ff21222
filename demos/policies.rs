//! Shows where first-fit and best-fit part ways: a large gap at a low
//! address and a smaller but sufficient gap further up.

use mempool::{Policy, Pool};

fn gap_pattern(policy: Policy) -> Pool {
    let mut pool = Pool::open(100, policy).unwrap();

    let low = pool.allocate(40).unwrap();
    let _middle = pool.allocate(30).unwrap();
    let high = pool.allocate(30).unwrap();

    pool.release(low).unwrap();
    pool.release(high).unwrap();
    // Gaps now: 40 bytes at offset 0, 30 bytes at offset 70.
    pool
}

fn main() {
    env_logger::init();

    for policy in [Policy::FirstFit, Policy::BestFit] {
        let mut pool = gap_pattern(policy);
        let alloc = pool.allocate(25).unwrap();
        println!(
            "{policy:?} placed a 25-byte request at offset {}",
            alloc.base()
        );
    }
}
