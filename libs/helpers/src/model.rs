use ndarray::Array2;
use rand::RngCore;
use rand_distr::{Distribution, Gamma};

use topic_query::model::{fixed::FixedTopicModel, BurstParameters};

/// Topic-word probabilities drawn from a symmetric Dirichlet
pub fn create_phi(num_topics: usize, vocabulary_size: usize, rng: &mut dyn RngCore) -> Array2<f64> {
    let gamma = Gamma::new(0.5, 1.).unwrap();
    let mut phi = Array2::<f64>::zeros((num_topics, vocabulary_size));
    for mut row in phi.rows_mut() {
        row.iter_mut()
            .for_each(|p| *p = gamma.sample(rng) + 1e-6);
        let total = row.sum();
        row.mapv_inplace(|p| p / total);
    }
    phi
}

pub fn create_model(num_topics: usize, vocabulary_size: usize, rng: &mut dyn RngCore) -> FixedTopicModel {
    FixedTopicModel::new(
        create_phi(num_topics, vocabulary_size, rng),
        vec![0.1; num_topics],
    )
    .expect("invalid random model")
}

pub fn create_bursty_model(
    num_topics: usize,
    vocabulary_size: usize,
    rng: &mut dyn RngCore,
) -> FixedTopicModel {
    create_model(num_topics, vocabulary_size, rng)
        .with_burstiness(BurstParameters {
            concentration: vec![10.; num_topics],
            discount: 0.2,
        })
        .expect("invalid burst parameters")
}
