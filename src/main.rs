use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use barcode_index::{
    alignment::seq_target_query,
    barcode_record::BarcodeRecord,
    distance_matrix::DistanceMatrix,
    error::{Error, Result},
    error_tolerant_trie::ErrorTolerantTrie,
    generate::{ReadGenerator, ReadGeneratorParameters},
    ngram_index::{NgramIndex, NgramIndexConfig, Threshold},
    similarity::hamming_distance,
    token::BarcodeLayout,
};
use clap::Parser;
use cli::{
    Cli, CliCommands, ClusterCommand, CountNeighboursCommand, CreateIndexCommand,
    DistanceMatrixCommand, GenerateReadsCommand, LocateWellsCommand,
};
use log::{info, warn};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;

fn main() {
    let cli = Cli::parse();

    if let Err(error) = TermLogger::init(
        cli.log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Could not initialise logging: {error}");
    }

    match cli.command {
        CliCommands::CreateIndex(create_index_command) => create_index(create_index_command),
        CliCommands::Cluster(cluster_command) => cluster(cluster_command),
        CliCommands::LocateWells(locate_wells_command) => locate_wells(locate_wells_command),
        CliCommands::CountNeighbours(count_neighbours_command) => {
            count_neighbours(count_neighbours_command)
        }
        CliCommands::DistanceMatrix(distance_matrix_command) => {
            distance_matrix(distance_matrix_command)
        }
        CliCommands::GenerateReads(generate_reads_command) => {
            generate_reads(generate_reads_command)
        }
    }
    .unwrap_or_else(|error| println!("Error: {error}"));
}

struct InputRead {
    amplicon_id: String,
    sequence: String,
}

fn read_input(path: &Path) -> Result<Vec<InputRead>> {
    let mut reads = Vec::new();
    for (line_index, line) in BufReader::new(File::open(path)?).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let Some((read_id, sequence)) = line.split_once('\t') else {
            return Err(Error::MalformedInputLine {
                line_number: line_index + 1,
            });
        };
        let amplicon_id = read_id
            .rsplit_once(':')
            .map_or(read_id, |(_, amplicon_id)| amplicon_id);
        reads.push(InputRead {
            amplicon_id: amplicon_id.to_string(),
            sequence: sequence.trim_end().to_string(),
        });
    }

    if reads.is_empty() {
        return Err(Error::EmptyInput);
    }
    info!("Read {} reads from {path:?}", reads.len());
    Ok(reads)
}

/// Cuts the barcode tokens out of the reads.
///
/// Skips reads too short for the layout and reads with characters outside of `ACGTN` in
/// their barcode.
fn barcode_tokens<'reads>(
    reads: &'reads [InputRead],
    layout: &BarcodeLayout,
) -> Result<Vec<(&'reads str, &'reads InputRead)>> {
    let mut tokens = Vec::with_capacity(reads.len());
    let mut short_reads = 0;
    let mut invalid_reads = 0;
    for read in reads {
        match layout.umi_well_sequence(&read.sequence) {
            Ok(token) => tokens.push((token, read)),
            Err(Error::LayoutOutOfRange { .. }) => short_reads += 1,
            Err(Error::InvalidCharacter { .. }) => invalid_reads += 1,
            Err(error) => return Err(error),
        }
    }

    if short_reads > 0 {
        warn!("Skipped {short_reads} reads that are too short for the barcode layout");
    }
    if invalid_reads > 0 {
        warn!("Skipped {invalid_reads} reads with unexpected characters in their barcode");
    }
    Ok(tokens)
}

/// A trie of the UMIs in the reads, recording well and amplicon ids per UMI.
fn umi_trie(
    reads: &[InputRead],
    layout: &BarcodeLayout,
) -> Result<ErrorTolerantTrie<BarcodeRecord>> {
    let mut trie = ErrorTolerantTrie::<BarcodeRecord>::with_token_length(layout.umi_length());
    for (token, read) in barcode_tokens(reads, layout)? {
        let (umi, well_id) = layout.split(token)?;
        if let Some(record) = trie.payload_mut(&umi) {
            record.add_read(&well_id, &read.amplicon_id);
            trie.insert(&umi, None)?;
        } else {
            trie.insert(&umi, Some(BarcodeRecord::new(&well_id, &read.amplicon_id)))?;
        }
    }

    info!(
        "Found {} distinct UMIs in {} reads",
        trie.len(),
        trie.total_count()
    );
    Ok(trie)
}

fn create_index(create_index_command: CreateIndexCommand) -> Result<()> {
    let layout = create_index_command.layout.barcode_layout();
    let reads = read_input(&create_index_command.input)?;

    // Build index.
    let mut index = NgramIndex::new(NgramIndexConfig {
        ngram_length: create_index_command.n_gram_length,
        token_length: Some(layout.token_length()),
        histogram_cache_capacity: create_index_command.histogram_cache_capacity,
        build_histogram_cache: create_index_command.build_histogram_cache,
    })?;
    for (token, read) in barcode_tokens(&reads, &layout)? {
        index.insert(token, Some(read.amplicon_id.clone()))?;
    }
    info!(
        "Indexed {} distinct tokens with {} distinct n-grams",
        index.len(),
        index.ngram_count()
    );

    // Write index parameters and index.
    let mut output = BufWriter::new(File::create(&create_index_command.output)?);
    ciborium::into_writer(&index.ngram_length(), &mut output)?;
    ciborium::into_writer(&index.token_length(), &mut output)?;
    ciborium::into_writer(&index, &mut output)?;

    Ok(())
}

fn load_index(path: &Path) -> Result<NgramIndex<String>> {
    let mut input = BufReader::new(File::open(path)?);
    let ngram_length: usize = ciborium::from_reader(&mut input)?;
    let token_length: Option<usize> = ciborium::from_reader(&mut input)?;
    info!("Loading index with n-gram length {ngram_length} and token length {token_length:?}");

    Ok(ciborium::from_reader(input)?)
}

fn cluster(cluster_command: ClusterCommand) -> Result<()> {
    let mut index = load_index(&cluster_command.index)?;
    let threshold = cluster_command.min_similarity.map_or(
        Threshold::MaxMismatches(cluster_command.max_mismatches),
        Threshold::MinSimilarity,
    );
    let centres: Vec<_> = index
        .tokens_by_count()
        .into_iter()
        .take_while(|&(_, count)| count >= cluster_command.min_count)
        .map(|(token, count)| (token.to_string(), count))
        .collect();

    let mut output = csv::Writer::from_writer(std::io::stdout().lock());
    output.write_record(["token", "count", "neighbours", "neighbour_reads"])?;
    let mut exact_clusters = 0;
    let mut inexact_clusters = 0;

    for (centre, count) in centres {
        // Already part of the cluster of a more frequent token.
        if !index.contains(&centre) {
            continue;
        }

        let neighbours: Vec<_> = index
            .histogram_refined_query(&centre, threshold)?
            .into_iter()
            .filter(|(token, _)| *token != centre)
            .collect();
        let neighbour_reads: usize = neighbours
            .iter()
            .map(|(token, _)| index.num_reads(token))
            .sum();
        output.write_record([
            centre.clone(),
            count.to_string(),
            neighbours.len().to_string(),
            neighbour_reads.to_string(),
        ])?;

        if neighbours.is_empty() {
            exact_clusters += 1;
        } else {
            inexact_clusters += 1;
        }
        for (neighbour, _) in neighbours {
            index.delete(&neighbour);
        }
    }

    output.flush()?;
    info!("Found {exact_clusters} tokens without and {inexact_clusters} tokens with near-duplicates");
    Ok(())
}

fn locate_wells(locate_wells_command: LocateWellsCommand) -> Result<()> {
    let index = load_index(&locate_wells_command.index)?;
    let well_ids: Vec<_> = BufReader::new(File::open(&locate_wells_command.wells)?)
        .lines()
        .filter(|line| line.as_ref().map_or(true, |line| !line.trim().is_empty()))
        .map(|line| line.map(|line| line.trim().to_string()))
        .collect::<std::io::Result<_>>()?;

    let mut output = csv::Writer::from_writer(std::io::stdout().lock());
    output.write_record(["well_id", "token", "start", "distance"])?;

    for well_id in well_ids {
        let mut found = 0;
        for candidate in
            index.diagonal_voting_query(&well_id, locate_wells_command.max_mismatch)?
        {
            let (start, distance) = if candidate
                .start
                .abs_diff(locate_wells_command.expected_position)
                <= locate_wells_command.max_well_offset
            {
                (Some(candidate.start), candidate.distance)
            } else {
                // The vote settled too far away, so search around the expected position.
                seq_target_query(
                    well_id.as_bytes(),
                    candidate.token.as_bytes(),
                    locate_wells_command.expected_position,
                    locate_wells_command.max_well_offset,
                    hamming_distance,
                )
            };
            let Some(start) = start else {
                continue;
            };

            output.write_record([
                well_id.clone(),
                candidate.token,
                start.to_string(),
                distance.to_string(),
            ])?;
            found += 1;
        }
        info!("Found well id {well_id} in {found} tokens");
    }

    output.flush()?;
    Ok(())
}

fn count_neighbours(count_neighbours_command: CountNeighboursCommand) -> Result<()> {
    let layout = count_neighbours_command.layout.barcode_layout();
    let reads = read_input(&count_neighbours_command.input)?;
    let mut trie = umi_trie(&reads, &layout)?;

    let centres: Vec<_> = trie
        .tokens_by_count()
        .into_iter()
        .take_while(|&(_, count)| count >= count_neighbours_command.min_count)
        .map(|(umi, count)| (umi.to_string(), count))
        .collect();
    info!(
        "Sweeping around {} UMIs with at least {} reads",
        centres.len(),
        count_neighbours_command.min_count
    );
    let sweep = trie.neighbour_sweep(
        centres.iter().map(|(umi, _)| umi.as_str()),
        count_neighbours_command.max_distance,
    );

    // Write CSV.
    let mut output = csv::Writer::from_writer(std::io::stdout().lock());
    output.write_record(
        ["UMI".to_string(), "count".to_string()].into_iter().chain(
            (1..=count_neighbours_command.max_distance).map(|distance| format!("dist{distance}")),
        ),
    )?;
    for ((_, count), neighbour_counts) in centres.iter().zip(sweep) {
        output.write_record(
            [neighbour_counts.centre, count.to_string()]
                .into_iter()
                .chain(neighbour_counts.counts.iter().map(usize::to_string)),
        )?;
    }

    output.flush()?;
    Ok(())
}

fn distance_matrix(distance_matrix_command: DistanceMatrixCommand) -> Result<()> {
    let layout = distance_matrix_command.layout.barcode_layout();
    let reads = read_input(&distance_matrix_command.input)?;
    let trie = umi_trie(&reads, &layout)?;

    let matrix = DistanceMatrix::from_trie(
        &trie,
        distance_matrix_command.min_count,
        distance_matrix_command.measure.into(),
    );
    match &distance_matrix_command.output {
        Some(output) => matrix.write_csv(BufWriter::new(File::create(output)?), "UMI"),
        None => matrix.write_csv(std::io::stdout().lock(), "UMI"),
    }
}

fn generate_reads(generate_reads_command: GenerateReadsCommand) -> Result<()> {
    // Initialise random number generator.
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(generate_reads_command.random_seed);

    let generator = ReadGenerator::new(
        ReadGeneratorParameters {
            layout: generate_reads_command.layout.barcode_layout(),
            molecule_amount: generate_reads_command.molecule_amount,
            well_id_amount: generate_reads_command.well_id_amount,
            amplicon_amount: generate_reads_command.amplicon_amount,
            duplicate_mean: generate_reads_command.duplicate_mean,
            substitution_mean: generate_reads_command.substitution_mean,
            insert_length: generate_reads_command.insert_length,
        },
        &mut rng,
    )?;
    let reads = generator.generate(&mut rng)?;

    let mut output = BufWriter::new(File::create(&generate_reads_command.output)?);
    for read in &reads {
        writeln!(output, "{}\t{}", read.read_id, read.sequence)?;
    }
    output.flush()?;

    if let Some(well_ids_output) = &generate_reads_command.well_ids_output {
        let mut output = BufWriter::new(File::create(well_ids_output)?);
        for well_id in generator.well_ids() {
            writeln!(output, "{well_id}")?;
        }
        output.flush()?;
    }

    info!(
        "Generated {} reads of {} molecules",
        reads.len(),
        generate_reads_command.molecule_amount
    );
    Ok(())
}
