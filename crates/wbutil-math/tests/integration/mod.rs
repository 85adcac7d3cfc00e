mod classifiers;
