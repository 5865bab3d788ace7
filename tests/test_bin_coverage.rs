#[allow(dead_code)]
mod train_blobs_bin {
    include!("../train_blobs.rs");

    #[cfg(test)]
    mod coverage_tests {
        use super::*;
        use binary_cnn::loss::cross_entropy_softmax_gradient;

        #[test]
        fn test_default_architecture_is_valid() {
            let arch = default_architecture();
            let out = validate_architecture(&arch).unwrap();
            assert_eq!(out, Shape::new(BATCH, 2, 1, 1));
        }

        #[test]
        fn test_two_class_output_accepted() {
            assert!(check_two_class_output(&default_architecture()).is_ok());
        }

        #[test]
        fn test_single_unit_output_rejected() {
            let mut arch = default_architecture();
            arch.layers[1].output_size = Some(1);
            let err = check_two_class_output(&arch).unwrap_err();
            assert!(err.to_string().contains("two-class"));
        }

        #[test]
        fn test_conv_only_output_rejected() {
            let mut arch = default_architecture();
            arch.layers.truncate(1);
            assert!(check_two_class_output(&arch).is_err());
        }

        #[test]
        fn test_make_batch_targets_are_one_hot() {
            let mut rng = SimpleRng::new(5);
            let shape = default_architecture().input.shape();
            let (images, targets) = make_batch(&mut rng, shape);

            assert_eq!(images.shape(), shape);
            assert_eq!(targets.shape(), Shape::new(BATCH, 2, 1, 1));
            for e in 0..BATCH {
                assert_eq!(targets[(e, 0, 0, 0)] + targets[(e, 1, 0, 0)], 1.0);
            }
            // every target row is accepted by the loss
            let uniform = Tensor::from_vec(targets.shape(), vec![0.5; BATCH * 2]).unwrap();
            assert!(cross_entropy_softmax_gradient(&uniform, &targets).is_ok());
        }

        #[test]
        fn test_make_batch_blob_lands_in_class_half() {
            let mut rng = SimpleRng::new(11);
            let shape = Shape::new(16, IMG, IMG, 1);
            let (images, targets) = make_batch(&mut rng, shape);
            let half = IMG / 2;

            for e in 0..shape.m {
                let class = usize::from(targets[(e, 1, 0, 0)] == 1.0);
                let mut bright = 0;
                for x in 0..IMG {
                    for y in 0..IMG {
                        if images[(e, x, y, 0)] == 1.0 {
                            bright += 1;
                            assert_eq!(x / half, class, "example {} pixel ({}, {})", e, x, y);
                        } else {
                            assert!(images[(e, x, y, 0)] <= 0.1);
                        }
                    }
                }
                assert_eq!(bright, 4);
            }
        }

        #[test]
        fn test_short_training_run_beats_chance() {
            let training = TrainingConfig {
                learning_rate: 0.05,
                epochs: 30,
                ..TrainingConfig::default()
            };
            let arch = default_architecture();
            let shape = arch.input.shape();
            let mut rng = SimpleRng::new(training.seed);
            let mut network = build_network(&arch, &training, &mut rng).unwrap();
            let optimizer = training.optimizer();

            let mut data_rng = SimpleRng::new(3);
            let train: Vec<_> = (0..TRAIN_BATCHES)
                .map(|_| make_batch(&mut data_rng, shape))
                .collect();

            let mut first = 0.0;
            let mut last = 0.0;
            for epoch in 0..training.epochs {
                let mut total = 0.0;
                for (images, targets) in &train {
                    total += network
                        .train_step(images, targets, &optimizer, training.learning_rate)
                        .unwrap();
                }
                if epoch == 0 {
                    first = total;
                }
                last = total;
            }
            assert!(last < first, "loss did not drop: {} -> {}", first, last);
        }
    }
}
