use crate::error::Error;
use crate::message::{ChannelCommunicator, Communicator};




/**
 * Run `f` once per rank of an in-process communicator group, each on its own
 * worker thread of a dedicated rayon pool, and return the results in rank
 * order. All ranks run concurrently, so they may block on each other.
 */
pub fn run_ranks<T, F>(num_ranks: usize, f: F) -> Result<Vec<T>, Error>
where
    T: Send,
    F: Fn(ChannelCommunicator) -> T + Sync,
{
    if num_ranks == 0 {
        return Err(Error::Configuration("need at least one rank".into()));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_ranks + 1)
        .thread_name(|i| format!("rank-worker-{}", i))
        .build()
        .map_err(|e| Error::Configuration(format!("could not start rank workers: {}", e)))?;

    let (sink, source) = crossbeam_channel::unbounded();

    pool.scope(|scope| {
        for comm in ChannelCommunicator::group(num_ranks) {
            let sink = sink.clone();
            let f = &f;

            scope.spawn(move |_| {
                let rank = comm.rank();
                sink.send((rank, f(comm))).ok();
            });
        }
    });
    drop(sink);

    let mut results: Vec<(usize, T)> = source.iter().collect();

    if results.len() != num_ranks {
        return Err(Error::Communication(format!(
            "{} of {} ranks returned",
            results.len(),
            num_ranks
        )));
    }
    results.sort_by_key(|(rank, _)| *rank);
    Ok(results.into_iter().map(|(_, value)| value).collect())
}
