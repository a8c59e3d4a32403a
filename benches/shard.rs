use depsize::{Extractor, LanguageStats, TreeIterator};
use divan::{Bencher, black_box};

fn main() {
    divan::main();
}

/// "he met a guy on Friday night who seemed really nice ." repeated
fn corpus(sentences: usize) -> String {
    let sentence = "1\the\the\tPRON\t_\t_\t2\tnsubj\t_\t_
2\tmet\tmeet\tVERB\t_\t_\t0\troot\t_\t_
3\ta\ta\tDET\t_\t_\t4\tdet\t_\t_
4\tguy\tguy\tNOUN\t_\t_\t2\tobj\t_\t_
5\ton\ton\tADP\t_\t_\t6\tcase\t_\t_
6\tFriday\tFriday\tPROPN\t_\t_\t2\tobl\t_\t_
7\tnight\tnight\tNOUN\t_\t_\t6\tflat\t_\t_
8\twho\twho\tPRON\t_\t_\t9\tnsubj\t_\t_
9\tseemed\tseem\tVERB\t_\t_\t4\tacl:relcl\t_\t_
10\treally\treally\tADV\t_\t_\t11\tadvmod\t_\t_
11\tnice\tnice\tADJ\t_\t_\t9\txcomp\t_\t_
12\t.\t.\tPUNCT\t_\t_\t2\tpunct\t_\t_

";
    sentence.repeat(sentences)
}

#[divan::bench(args = [100, 1000])]
fn parse(bencher: Bencher, sentences: usize) {
    let text = corpus(sentences);
    bencher.bench_local(|| {
        for result in TreeIterator::from_string(black_box(&text)) {
            black_box(result.unwrap());
        }
    });
}

#[divan::bench(args = [100, 1000])]
fn accumulate(bencher: Bencher, sentences: usize) {
    let text = corpus(sentences);
    let extractor = Extractor::default();
    bencher.bench_local(|| black_box(extractor.accumulate_str(black_box(&text)).unwrap()));
}

#[divan::bench(args = [false, true])]
fn spans(bencher: Bencher, bastards: bool) {
    let extractor = Extractor::new(depsize::ExtractionConfig::default().with_bastards(bastards));
    let trees: Vec<_> = TreeIterator::from_string(&corpus(200))
        .map(Result::unwrap)
        .collect();
    bencher.bench_local(|| {
        let mut stats = LanguageStats::default();
        for tree in &trees {
            let mut tree = tree.clone();
            extractor.prepare(&mut tree);
            extractor.accumulate_tree(&tree, &mut stats);
        }
        black_box(stats)
    });
}
