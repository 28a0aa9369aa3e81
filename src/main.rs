use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use light_primer::checkpoint;
use light_primer::config::TrainConfig;
use light_primer::data::{DataLoader, Dataset, TensorDataset};
use light_primer::nn::{
    BceLoss, CrossEntropyLoss, Dropout, Flatten, L1Loss, LeakyReLU, Linear, Loss, Module,
    MseLoss, ReLU, Sequential, Sigmoid, Softmax, Tanh, TwoLayerNet,
};
use light_primer::optim::{Optimizer, Sgd};
use light_primer::tensor::{functional, manual_seed, no_grad, RcTensor};
use light_primer::train;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    Tensors,
    Autograd,
    Network,
    Training,
    Dataset,
    Checkpoint,
    Layers,
}

const ALL_SECTIONS: [Section; 7] = [
    Section::Tensors,
    Section::Autograd,
    Section::Network,
    Section::Training,
    Section::Dataset,
    Section::Checkpoint,
    Section::Layers,
];

/// A guided tour of tensors, autograd, networks and training.
#[derive(Parser, Debug)]
#[command(name = "light_primer", version, about)]
struct Args {
    /// TOML file with training settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of training iterations
    #[arg(long)]
    epochs: Option<usize>,

    /// Learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Width of the hidden layer
    #[arg(long)]
    hidden: Option<usize>,

    /// Seed for weight init, noise, dropout and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Where the checkpoint section writes parameters
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Run a single section instead of all of them
    #[arg(long, value_enum)]
    section: Option<Section>,
}

impl Args {
    fn train_config(&self) -> anyhow::Result<TrainConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => TrainConfig::from_toml_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => TrainConfig::default(),
        };
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(lr) = self.lr {
            config.learning_rate = lr;
        }
        if let Some(hidden) = self.hidden {
            config.hidden_size = hidden;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate().context("invalid training settings")?;
        Ok(config)
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("light_primer_two_layer_net.json"))
    }
}

fn heading(title: &str) {
    println!("\n=== {title} ===");
}

fn tensors() -> anyhow::Result<()> {
    heading("tensors");
    let x = RcTensor::from([[1.0f32, 2.0], [3.0, 4.0]]);
    println!("x = {x}");
    println!("shape = {:?}, dtype = {}, numel = {}", x.shape(), x.dtype(), x.numel());
    println!("zeros(2, 3) = {}", RcTensor::<f32>::zeros(&[2, 3]));
    println!("ones(3) = {}", RcTensor::<f32>::ones(&[3]));
    println!("arange(0, 5) = {}", RcTensor::arange(0i64, 5, 1)?);
    println!("linspace(0, 1, 5) = {}", RcTensor::<f32>::linspace(0.0, 1.0, 5)?);
    println!("eye(2) = {}", RcTensor::<f32>::eye(2));
    println!("randn(2, 2) = {}", RcTensor::<f32>::randn(&[2, 2]));
    println!("x + 1 = {}", &x + 1.0);
    println!("x * x = {}", &x * &x);
    println!("x @ x = {}", x.matmul(&x)?);
    println!("x.T = {}", x.t()?);
    println!("x.sum() = {}", x.sum());
    println!("x.mean(dim=0) = {}", x.mean_dim(0, false)?);
    println!("x.reshape(4) = {}", x.reshape(&[4])?);
    Ok(())
}

fn autograd() -> anyhow::Result<()> {
    heading("autograd");
    let x = RcTensor::scalar(2.0f32).requires_grad_(true)?;
    let y = &(&x.pow(2.0) + &(&x * 3.0)) + 1.0;
    println!("x = {x}");
    println!("y = x^2 + 3x + 1 = {y}");
    y.backward()?;
    let grad = x.grad().context("x has no gradient after backward")?;
    println!("dy/dx = {}", grad.item()?);
    Ok(())
}

fn network(config: &TrainConfig) -> anyhow::Result<()> {
    heading("network");
    let net = TwoLayerNet::<f32>::new(4, config.hidden_size, 2)?;
    println!("{}", net.describe());
    for (name, param) in net.named_parameters() {
        println!("  {name}: {:?}", param.shape());
    }
    println!("parameters: {}", net.num_parameters());
    let input = RcTensor::<f32>::randn(&[3, 4]);
    let output = net.forward(&input)?;
    println!("input shape {:?} -> output shape {:?}", input.shape(), output.shape());
    Ok(())
}

/// `y = 3x + 2` plus a little noise, as `(100, 1)` columns.
fn noisy_line() -> anyhow::Result<(RcTensor<f32>, RcTensor<f32>)> {
    let x = RcTensor::<f32>::linspace(-1.0, 1.0, 100)?.reshape(&[100, 1])?;
    let noise = &RcTensor::<f32>::randn(&[100, 1]) * 0.1;
    let y = &(&(&x * 3.0) + 2.0) + &noise;
    Ok((x, y))
}

fn training(config: &TrainConfig) -> anyhow::Result<()> {
    heading("training");
    let (x, y) = noisy_line()?;
    let model = TwoLayerNet::<f32>::new(1, config.hidden_size, 1)?;
    let criterion = MseLoss::new();
    let mut optimizer = Sgd::new(model.parameters(), config.learning_rate as f32)?
        .with_momentum(config.momentum as f32)?;

    for epoch in 1..=config.epochs {
        let prediction = model.forward(&x)?;
        let loss = criterion.loss(&prediction, &y)?;
        optimizer.zero_grad();
        loss.backward()?;
        optimizer.step()?;
        if epoch % config.log_every == 0 {
            println!("epoch {epoch:>4}: loss = {:.4}", loss.item()?);
        }
    }

    let sample_input = RcTensor::from([[0.5f32]]);
    let prediction = no_grad(|| model.forward(&sample_input))?;
    println!("f(0.5) = {:.4} (target 3.5)", prediction.item()?);
    Ok(())
}

fn dataset(config: &TrainConfig) -> anyhow::Result<()> {
    heading("dataset");
    let (x, y) = noisy_line()?;
    let dataset = TensorDataset::new(x, y)?;
    println!("dataset has {} samples", dataset.len());
    let (sample_x, sample_y) = dataset.get(0)?;
    println!("dataset[0] = ({sample_x}, {sample_y})");

    let loader = DataLoader::new(dataset, config.batch_size)?.shuffle(true);
    println!("{} batches of up to {}", loader.len(), loader.batch_size());
    if let Some(batch) = loader.iter().next() {
        let (inputs, targets) = batch?;
        println!("first batch: inputs {:?}, targets {:?}", inputs.shape(), targets.shape());
    }

    let mut model = Linear::<f32>::new(1, 1)?;
    let mut optimizer = Sgd::new(model.parameters(), config.learning_rate as f32)?;
    let history = train::fit(&mut model, &mut optimizer, &MseLoss::new(), &loader, config)?;
    let eval_loss = train::evaluate(&mut model, &MseLoss::new(), &loader)?;
    println!(
        "after {} epochs: train loss {:.4}, eval loss {:.4}, weight {:.3}, bias {:.3}",
        history.epoch_losses.len(),
        history.final_loss().unwrap_or_default(),
        eval_loss,
        model.weight.item()?,
        model.bias.as_ref().map_or(Ok(0.0), |b| b.item())?,
    );
    Ok(())
}

fn checkpoint_section(config: &TrainConfig, path: &Path) -> anyhow::Result<()> {
    heading("checkpoint");
    let model = TwoLayerNet::<f32>::new(1, config.hidden_size, 1)?;
    checkpoint::save_module(&model, path)
        .with_context(|| format!("saving parameters to {}", path.display()))?;
    println!("saved {} tensors to {}", model.state_dict().len(), path.display());

    let restored = TwoLayerNet::<f32>::new(1, config.hidden_size, 1)?;
    checkpoint::load_module(&restored, path)
        .with_context(|| format!("loading parameters from {}", path.display()))?;

    let sample_input = RcTensor::<f32>::linspace(-1.0, 1.0, 3)?.reshape(&[3, 1])?;
    let (before, after) = no_grad(|| -> light_primer::Result<_> {
        Ok((model.forward(&sample_input)?, restored.forward(&sample_input)?))
    })?;
    println!("original output = {before}");
    println!("restored output = {after}");
    println!("identical: {}", before == after);
    Ok(())
}

fn layers() -> anyhow::Result<()> {
    heading("layers");
    let modules: Vec<Box<dyn Module<f32>>> = vec![
        Box::new(Linear::<f32>::new(10, 5)?),
        Box::new(ReLU),
        Box::new(LeakyReLU::new(0.01f32)),
        Box::new(Sigmoid),
        Box::new(Tanh),
        Box::new(Softmax::new(1)),
        Box::new(Dropout::new(0.5)?),
        Box::new(Flatten::new()),
    ];
    for module in modules.iter() {
        println!("{}", module.describe());
    }
    let stack = Sequential::<f32>::new()
        .add(Linear::new(4, 8)?)
        .add(ReLU)
        .add(Linear::new(8, 2)?);
    println!("{}", stack.describe());

    let losses: [&dyn Loss<f32>; 4] = [
        &MseLoss::new(),
        &L1Loss::new(),
        &CrossEntropyLoss::new(),
        &BceLoss::new(),
    ];
    let names: Vec<&str> = losses.iter().map(|l| l.name()).collect();
    println!("losses: {}", names.join(", "));

    let logits = RcTensor::from([[2.0f32, 0.5, -1.0]]);
    println!("softmax({logits}) = {}", functional::softmax(&logits, 1)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.train_config()?;
    manual_seed(config.seed);
    info!(?config, "settings");

    let sections = match args.section {
        Some(section) => vec![section],
        None => ALL_SECTIONS.to_vec(),
    };
    for section in sections {
        let result = match section {
            Section::Tensors => tensors(),
            Section::Autograd => autograd(),
            Section::Network => network(&config),
            Section::Training => training(&config),
            Section::Dataset => dataset(&config),
            Section::Checkpoint => checkpoint_section(&config, &args.checkpoint_path()),
            Section::Layers => layers(),
        };
        result.with_context(|| format!("section {section:?} failed"))?;
    }
    Ok(())
}
