//! Pool de workers borné, exécuté par vagues
//!
//! Tous les workers d'une vague écrivent dans un même canal borné. La boucle
//! principale vide le canal en continu et ne joint les threads qu'une fois
//! tous terminés et le canal vide: un worker bloqué sur un canal plein ne
//! peut donc jamais attendre un `join` qui l'attend lui-même.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

/// Paramètres du pool
#[derive(Debug, Clone)]
pub struct WaveConfig {
    /// Nombre de workers simultanés
    pub wave_size: usize,
    /// Capacité du canal de résultats
    pub channel_capacity: usize,
    /// Attente maximale d'un `recv` avant de vérifier l'état des workers
    pub poll_interval: Duration,
}

impl Default for WaveConfig {
    fn default() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self {
            wave_size: cores,
            channel_capacity: cores,
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Exécute `job` sur chaque élément, par vagues de `wave_size` threads
///
/// `fallback` est évalué avant le lancement de chaque worker; sa valeur
/// remplace le résultat si le worker panique ou ne peut pas être lancé.
/// L'ordre des résultats n'est pas garanti.
pub fn run_waves<T, R, F, G>(items: Vec<T>, config: &WaveConfig, job: F, fallback: G) -> Vec<R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
    G: Fn(&T) -> R,
{
    let total = items.len();
    let wave_size = config.wave_size.max(1);
    let job = Arc::new(job);
    let (tx, rx) = mpsc::sync_channel::<R>(config.channel_capacity);
    let mut results = Vec::with_capacity(total);
    let mut items = items.into_iter().peekable();
    let mut wave_index = 0;

    while items.peek().is_some() {
        let wave: Vec<T> = items.by_ref().take(wave_size).collect();
        let mut handles = Vec::with_capacity(wave.len());
        wave_index += 1;
        debug!(wave = wave_index, workers = wave.len(), "Starting wave");

        for (i, item) in wave.into_iter().enumerate() {
            let spare = fallback(&item);
            let on_panic = spare.clone();
            let job = Arc::clone(&job);
            let tx = tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("var-worker-{wave_index}-{i}"))
                .spawn(move || {
                    let result = catch_unwind(AssertUnwindSafe(|| (*job)(item))).unwrap_or_else(|_| {
                        error!(wave = wave_index, worker = i, "Worker panicked");
                        on_panic
                    });
                    // le récepteur vit jusqu'à la fin de run_waves
                    let _ = tx.send(result);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(wave = wave_index, worker = i, error = %e, "Failed to spawn worker");
                    results.push(spare);
                }
            }
        }

        // Vider le canal avant tout join
        loop {
            match rx.recv_timeout(config.poll_interval) {
                Ok(result) => results.push(result),
                Err(RecvTimeoutError::Timeout) => {
                    if handles.iter().all(|h| h.is_finished()) {
                        results.extend(rx.try_iter());
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for handle in handles {
            if handle.join().is_err() {
                error!(wave = wave_index, "Worker thread terminated abnormally");
            }
        }
    }

    debug!(results = results.len(), items = total, "All waves completed");
    results
}
