use super::*;

use rand::seq::{IteratorRandom, SliceRandom};
use rayon::prelude::*;

/// How a single offspring comes to be.
enum Birth<'a, G> {
    /// Copied as-is from the previous generation.
    Elite(&'a G),
    /// Mated from two parents, which may be the same genome.
    Mated(&'a G, &'a G),
}

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs
/// and allotted offspring.
///
/// Parents are picked sequentially, and then mated
/// in parallel. Every child's structural mutations are
/// proposed to `innovations` under the child's position
/// in the returned offspring.
pub(super) struct OffspringFactory<'a, C, G> {
    species: &'a [Species<G>],
    innovations: &'a PopulationInnovations<G>,
    genetic_config: &'a C,
    population_config: &'a PopulationConfig,
}

impl<'a, C, G> OffspringFactory<'a, C, G>
where
    G: Genome<Config = C> + Clone + Send + Sync,
    C: Sync,
{
    pub(super) fn new(
        species: &'a [Species<G>],
        innovations: &'a PopulationInnovations<G>,
        genetic_config: &'a C,
        population_config: &'a PopulationConfig,
    ) -> OffspringFactory<'a, C, G> {
        OffspringFactory {
            species,
            innovations,
            genetic_config,
            population_config,
        }
    }

    /// Generate the alloted offspring, along with
    /// the species each child is assigned to.
    pub(super) fn generate_offspring(
        &self,
        allotted_offspring: &[usize],
    ) -> (Vec<G>, Vec<SpeciesID>) {
        let births = self.plan_births(allotted_offspring);
        let offspring: Vec<(G, SpeciesID)> = births
            .par_iter()
            .enumerate()
            .map(|(index, (birth, species))| {
                let child = match *birth {
                    Birth::Elite(genome) => genome.clone(),
                    Birth::Mated(parent1, parent2) => G::mate(
                        parent1,
                        parent2,
                        &self.innovations.sink(index),
                        self.genetic_config,
                    ),
                };
                (child, *species)
            })
            .collect();
        offspring.into_iter().unzip()
    }

    /// Decides every offspring's parents and species.
    fn plan_births(&self, allotted_offspring: &[usize]) -> Vec<(Birth<'a, G>, SpeciesID)> {
        let all_species: &'a [Species<G>] = self.species;
        let mut births = Vec::with_capacity(allotted_offspring.iter().sum());
        for (species, allotted) in all_species.iter().zip(allotted_offspring) {
            let elite = species.elite(self.population_config);
            let elite = &elite[..elite.len().min(*allotted)];
            births.extend(elite.iter().map(|genome| (Birth::Elite(genome), species.id())));
            self.plan_matings(species, allotted - elite.len(), &mut births);
        }
        births
    }

    /// Choose parents from the species or from
    /// other species, and the child's species.
    fn plan_matings(
        &self,
        species: &'a Species<G>,
        offspring: usize,
        births: &mut Vec<(Birth<'a, G>, SpeciesID)>,
    ) {
        let eligible_parents = species.survivors(self.population_config);
        let mut rng = rand::thread_rng();
        for _ in 0..offspring {
            let parent1 = eligible_parents
                .choose(&mut rng)
                .unwrap_or_else(|| panic!("no eligible parents in species {:?}", species.id()));
            if rng.gen::<f32>() < self.population_config.sexual_reproduction_chance {
                let (parent2_species, parent2) = self.choose_second_parent(species);
                let child_species = if rng.gen::<bool>() {
                    species.id()
                } else {
                    parent2_species
                };
                births.push((Birth::Mated(parent1, parent2), child_species));
            } else {
                births.push((Birth::Mated(parent1, parent1), species.id()));
            }
        }
    }

    /// Choose a parent from the current species,
    /// or from another randomly selected.
    fn choose_second_parent(&self, current_species: &'a Species<G>) -> (SpeciesID, &'a G) {
        let all_species: &'a [Species<G>] = self.species;
        let mut rng = rand::thread_rng();
        let species = if all_species.len() > 1
            && rng.gen::<f32>() < self.population_config.interspecies_mating_chance
        {
            all_species
                .iter()
                .filter(|s| s.id() != current_species.id())
                .choose(&mut rng)
                .unwrap_or(current_species)
        } else {
            current_species
        };
        (
            species.id(),
            species
                .members
                .choose(&mut rng)
                .unwrap_or_else(|| panic!("no eligible parents in species {:?}", species.id())),
        )
    }
}
